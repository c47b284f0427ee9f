//! Markup text writer
//!
//! Output uses tab indentation and CRLF line endings:
//!
//! ```text
//! screen
//! {
//! 	name: "main"
//!
//! 	size: 640, 480
//! }
//! ```
//!
//! Values are written with `Variable::to_markup`; see there for the cases
//! that read back as a different value.

use crate::tree::{ElemId, ElemShape, InfoTree};

const NEWLINE: &str = "\r\n";

fn indent(out: &mut String, level: usize) {
    out.extend(std::iter::repeat('\t').take(level));
}

impl InfoTree {
    /// Markup text for the subtree at `id`
    pub fn to_markup_string(&self, id: ElemId) -> String {
        let mut out = String::new();
        self.write_elem(id, 0, &mut out);
        out
    }

    /// Append the subtree at `id`, indented `level` tabs
    pub fn write_elem(&self, id: ElemId, level: usize, out: &mut String) {
        let Some(elem) = self.get(id) else {
            return;
        };

        // List members are bare values
        if let Some(parent) = elem.parent().and_then(|p| self.get(p)) {
            if parent.shape() == ElemShape::ValueList {
                out.push_str(&elem.value().to_markup());
                return;
            }
        }

        indent(out, level);
        out.push_str(elem.name());

        match elem.shape() {
            ElemShape::Value => {
                out.push_str(": ");
                out.push_str(&elem.value().to_markup());
                out.push_str(NEWLINE);
            }
            ElemShape::ValueList => {
                out.push_str(": ");
                for (i, &child) in elem.children().iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    self.write_elem(child, level + 1, out);
                }
                out.push_str(NEWLINE);
            }
            ElemShape::ValueBlock => {
                out.push(' ');
                out.push_str(&elem.value().to_markup());
                self.write_block(id, level, out);
            }
            ElemShape::Block => self.write_block(id, level, out),
        }
    }

    fn write_block(&self, id: ElemId, level: usize, out: &mut String) {
        out.push_str(NEWLINE);
        indent(out, level);
        out.push('{');
        out.push_str(NEWLINE);
        for (i, &child) in self.children(id).iter().enumerate() {
            if i > 0 {
                out.push_str(NEWLINE);
            }
            self.write_elem(child, level + 1, out);
        }
        indent(out, level);
        out.push('}');
        out.push_str(NEWLINE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::variable::Variable;

    #[test]
    fn block_layout() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("screen");
        tree.create_value(root, "name", "main").unwrap();
        let size = tree.create_child(root, "size", ElemShape::ValueList).unwrap();
        tree.from_int_array(size, &[640, 480]).unwrap();

        assert_eq!(
            tree.to_markup_string(root),
            "screen\r\n{\r\n\tname: \"main\"\r\n\r\n\tsize: 640, 480\r\n}\r\n"
        );
    }

    #[test]
    fn nested_value_block() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("root");
        let d = tree.create_child(root, "d", ElemShape::ValueBlock).unwrap();
        tree.set_value(d, 7).unwrap();
        tree.create_value(d, "on", true).unwrap();

        assert_eq!(
            tree.to_markup_string(root),
            "root\r\n{\r\n\td 7\r\n\t{\r\n\t\ton: true\r\n\t}\r\n}\r\n"
        );
    }

    #[test]
    fn scalar_formats() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("r");
        let list = tree.create_child(root, "v", ElemShape::ValueList).unwrap();
        tree.from_values(
            list,
            [
                Variable::Dword(255),
                Variable::Float(2.5),
                Variable::enum_name("left"),
                Variable::String(None),
            ],
        )
        .unwrap();
        assert_eq!(
            tree.to_markup_string(list),
            "v: 0xFF, 2.5, left, (null)\r\n"
        );
    }

    #[test]
    fn empty_block() {
        let mut tree = InfoTree::new();
        let root = tree.create_root("empty");
        assert_eq!(tree.to_markup_string(root), "empty\r\n{\r\n}\r\n");
    }
}
