// Vector graphic produced by a chart renderer
const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorGraphic {
    markup: String,
}

impl VectorGraphic {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    /// Standalone markup of the graphic.
    ///
    /// A root `<svg>` without a namespace declaration gets the SVG namespace,
    /// so that inline page markup parses as a standalone document.
    pub fn serialize(&self) -> String {
        let Some(start) = root_svg_start(&self.markup) else {
            return self.markup.clone();
        };
        let tag_end = self.markup[start..]
            .find('>')
            .map(|i| start + i)
            .unwrap_or(self.markup.len());

        if self.markup[start..tag_end].contains("xmlns=") {
            return self.markup.clone();
        }

        let insert_at = start + "<svg".len();
        let mut out = String::with_capacity(self.markup.len() + SVG_NAMESPACE.len() + 10);
        out.push_str(&self.markup[..insert_at]);
        out.push_str(&format!(" xmlns=\"{}\"", SVG_NAMESPACE));
        out.push_str(&self.markup[insert_at..]);
        out
    }
}

/// Byte offset of the root `<svg` start tag, skipping comments and
/// elements that only share the prefix.
fn root_svg_start(markup: &str) -> Option<usize> {
    let mut pos = 0;
    while let Some(offset) = markup[pos..].find('<') {
        let at = pos + offset;
        let rest = &markup[at..];

        if rest.starts_with("<!--") {
            let end = rest.find("-->")?;
            pos = at + end + 3;
            continue;
        }
        if let Some(after) = rest.strip_prefix("<svg") {
            match after.chars().next() {
                Some(c) if c.is_whitespace() || c == '>' || c == '/' => return Some(at),
                _ => {}
            }
        }
        pos = at + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_adds_namespace() {
        let graphic = VectorGraphic::new("<svg width=\"10\" height=\"5\"></svg>");
        assert_eq!(
            graphic.serialize(),
            "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"10\" height=\"5\"></svg>"
        );
    }

    #[test]
    fn test_serialize_keeps_existing_namespace() {
        let markup = "<?xml version=\"1.0\"?><svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        assert_eq!(VectorGraphic::new(markup).serialize(), markup);
    }

    #[test]
    fn test_serialize_anchors_root_element() {
        let markup = "<!-- <svg width=\"1\"> --><svgx/><svg width=\"4\"/>";
        assert_eq!(
            VectorGraphic::new(markup).serialize(),
            "<!-- <svg width=\"1\"> --><svgx/><svg xmlns=\"http://www.w3.org/2000/svg\" width=\"4\"/>"
        );
    }

    #[test]
    fn test_serialize_without_svg_root_is_unchanged() {
        let markup = "<svgfoo/><!-- <svg> -->";
        assert_eq!(VectorGraphic::new(markup).serialize(), markup);
    }
}
