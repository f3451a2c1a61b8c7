// Stack templates that ship with the binary. A template dir entry for the
// same stack shadows these.

pub static TEMPLATE_PHP: &str = r#"{
  "stack": "php",
  "instructions": [
    { "op": "base_image", "image": "ubuntu:22.04" },
    { "op": "install_packages",
      "packages": ["apache2", "php", "libapache2-mod-php", "php-mysql", { "slot": "extra_packages" }] },
    { "op": "copy", "sources": [{ "slot": "copy_files" }], "dest": "/var/www/html/" },
    { "op": "expose", "port": { "slot": "port" } },
    { "op": "entrypoint", "command": [{ "slot": "command" }] }
  ],
  "slots": [
    { "name": "extra_packages", "type": "string_list", "default": [] },
    { "name": "copy_files", "type": "string_list", "default": ["index.php"] },
    { "name": "port", "type": "port", "required": true },
    { "name": "command", "type": "arg_vector", "default": ["apachectl", "-D", "FOREGROUND"] }
  ]
}"#;

pub static TEMPLATE_PYTHON: &str = r#"{
  "stack": "python",
  "instructions": [
    { "op": "base_image", "image": "python:3.11-slim" },
    { "op": "install_packages", "packages": [{ "slot": "extra_packages" }] },
    { "op": "copy", "sources": [{ "slot": "copy_files" }], "dest": "/app/" },
    { "op": "expose", "port": { "slot": "port" } },
    { "op": "entrypoint", "command": [{ "slot": "command" }] }
  ],
  "slots": [
    { "name": "extra_packages", "type": "string_list", "default": [] },
    { "name": "copy_files", "type": "string_list", "default": ["main.py"] },
    { "name": "port", "type": "port", "default": 8000 },
    { "name": "command", "type": "arg_vector", "default": ["python", "/app/main.py"] }
  ]
}"#;

pub static TEMPLATE_NODE: &str = r#"{
  "stack": "node",
  "instructions": [
    { "op": "base_image", "image": "node:20-slim" },
    { "op": "install_packages", "packages": [{ "slot": "extra_packages" }] },
    { "op": "copy", "sources": [{ "slot": "copy_files" }], "dest": "/app/" },
    { "op": "expose", "port": { "slot": "port" } },
    { "op": "entrypoint", "command": [{ "slot": "command" }] }
  ],
  "slots": [
    { "name": "extra_packages", "type": "string_list", "default": [] },
    { "name": "copy_files", "type": "string_list", "default": ["index.js", "package.json"] },
    { "name": "port", "type": "port", "default": 3000 },
    { "name": "command", "type": "arg_vector", "default": ["node", "/app/index.js"] }
  ]
}"#;

pub static BUILTIN_TEMPLATES: &[&str] = &[TEMPLATE_PHP, TEMPLATE_PYTHON, TEMPLATE_NODE];
