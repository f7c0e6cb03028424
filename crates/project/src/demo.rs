//! Seed project used when no persisted project exists.
//! 尚未有儲存專案時使用的示範專案。

use crate::tree::{FileNode, Language, ProjectTree};

const README: &str = r#"# Welcome to AetherCode!

This is a demo project to showcase the capabilities of AetherCode, your AI-powered coding companion.

## Features

- **File Explorer**: Browse your project files on the left.
- **Tabbed Editor**: Open and edit multiple files.
- **AI Assistance**: Use the panel on the right to get code suggestions and diagnostics.

Try selecting a file and using the AI tools!
"#;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>AetherCode</title>
  <link rel="stylesheet" href="style.css">
</head>
<body>
  <h1>Hello, AetherCode!</h1>
  <p>This is a live preview of your web project.</p>
  <script src="script.js"></script>
</body>
</html>"#;

const STYLE_CSS: &str = r#"body {
  font-family: sans-serif;
  background-color: #f0f0f0;
  color: #333;
  display: flex;
  flex-direction: column;
  justify-content: center;
  align-items: center;
  height: 100vh;
}

h1 {
  color: #007acc;
}"#;

const SCRIPT_JS: &str = r#"document.addEventListener('DOMContentLoaded', () => {
  const heading = document.querySelector('h1');
  heading.addEventListener('click', () => {
    alert('You clicked the heading!');
    // Try asking the AI to add a new feature here.
    // For example: "add a new paragraph element with some text"
  });
});"#;

const HELPERS_PY: &str = r#"# A simple Python script
def greet(name):
  """This function greets the person passed in as a parameter."""
  print(f"Hello, {name}!")

# Try using the AI Diagnostics tool on this code.
# There aren't any bugs, but it might suggest type hints!
if __name__ == "__main__":
  greet("AetherCoder")"#;

/// Builds the demo project (`proj_1`).
/// 建立示範專案（`proj_1`）。
pub fn project() -> ProjectTree {
    let mut tree = ProjectTree::empty("proj_1", "Demo Project");
    tree.owner_id = Some("user_123".to_string());
    tree.branch = Some("main".to_string());
    tree.files = vec![
        FileNode::file("1", "README.md", README, Language::Markdown),
        FileNode::folder(
            "2",
            "WebApp",
            vec![
                FileNode::file("3", "index.html", INDEX_HTML, Language::Html),
                FileNode::file("4", "style.css", STYLE_CSS, Language::Css),
                FileNode::file("5", "script.js", SCRIPT_JS, Language::JavaScript),
            ],
        ),
        FileNode::folder(
            "6",
            "utils",
            vec![FileNode::file("7", "helpers.py", HELPERS_PY, Language::Python)],
        ),
    ];
    tree
}
