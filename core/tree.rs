use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct TreeNode {
    children: BTreeMap<String, TreeNode>,
}

impl TreeNode {
    fn insert(&mut self, path: &str) {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.entry(segment.to_string()).or_default();
        }
    }
}

/// Renders project-relative paths as a tree drawing. Siblings are sorted by name; the input
/// order does not matter.
pub fn render_tree<S: AsRef<str>>(paths: &[S]) -> String {
    let mut root = TreeNode::default();
    for path in paths {
        root.insert(path.as_ref());
    }
    let mut lines = Vec::new();
    render_level(&root, "", &mut lines);
    lines.join("\n")
}

fn render_level(node: &TreeNode, indent: &str, lines: &mut Vec<String>) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let is_last = i + 1 == count;
        let branch = if is_last { "└─ " } else { "├─ " };
        lines.push(format!("{}{}{}", indent, branch, name));
        let next_indent = format!("{}{}", indent, if is_last { "   " } else { "│  " });
        render_level(child, &next_indent, lines);
    }
}
