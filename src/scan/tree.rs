//! ASCII rendering of a set of relative paths.

use std::collections::BTreeMap;

#[derive(Default)]
struct Node {
    children: BTreeMap<String, Node>,
}

/// Renders paths as a nested tree using `├── ` / `└── ` connectors.
///
/// Entries at every level are sorted by name, so the output depends only on
/// the set of paths and not on their order.
///
/// ```
/// let tree = codemapper::scan::render_tree(&["src/main.rs", "Cargo.toml", "src/lib.rs"]);
/// assert_eq!(tree, "├── Cargo.toml\n└── src\n    ├── lib.rs\n    └── main.rs\n");
/// ```
#[must_use]
pub fn render_tree<S: AsRef<str>>(paths: &[S]) -> String {
    let mut root = Node::default();
    for path in paths {
        let mut node = &mut root;
        for part in path.as_ref().split('/').filter(|p| !p.is_empty()) {
            node = node.children.entry(part.to_string()).or_default();
        }
    }

    let mut out = String::new();
    render_level(&root, "", &mut out);
    out
}

fn render_level(node: &Node, prefix: &str, out: &mut String) {
    let count = node.children.len();
    for (i, (name, child)) in node.children.iter().enumerate() {
        let last = i + 1 == count;
        out.push_str(prefix);
        out.push_str(if last { "└── " } else { "├── " });
        out.push_str(name);
        out.push('\n');
        if !child.children.is_empty() {
            let nested = format!("{prefix}{}", if last { "    " } else { "│   " });
            render_level(child, &nested, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_levels_use_continuation_bars() {
        let tree = render_tree(&["a/x.go", "a/y.go", "b/z.go"]);
        assert_eq!(
            tree,
            "├── a\n│   ├── x.go\n│   └── y.go\n└── b\n    └── z.go\n"
        );
    }

    #[test]
    fn input_order_does_not_matter() {
        let forward = render_tree(&["src/a.rs", "src/b/c.rs", "main.rs"]);
        let backward = render_tree(&["main.rs", "src/b/c.rs", "src/a.rs"]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_input_renders_nothing() {
        let empty: [&str; 0] = [];
        assert_eq!(render_tree(&empty), "");
    }
}
