use scraper::{ElementRef, Node};

/// Elements whose text is never rendered.
const INVISIBLE: [&str; 4] = ["script", "style", "template", "noscript"];

/// All text below `node`, concatenated as it appears.
pub fn extract_text(node: ElementRef) -> String {
    node.text().collect::<String>()
}

/// Text below `node` with every text fragment trimmed before joining, so
/// `<td> 5 <br> </td>` becomes `"5"` and `<b>Deutsch</b> <i>LK</i>` becomes
/// `"DeutschLK"`.
pub fn extract_stripped_text(node: ElementRef) -> String {
    node.text().map(str::trim).collect::<String>()
}

/// Text below `node` a reader would see, i.e. without script, style,
/// template and noscript contents.
pub fn extract_visible_text(node: ElementRef) -> String {
    node.descendants()
        .filter_map(|n| match n.value() {
            Node::Text(text) => Some((n, text)),
            _ => None,
        })
        .filter(|(n, _)| {
            !n.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|el| INVISIBLE.contains(&el.value().name()))
        })
        .map(|(_, text)| &**text)
        .collect::<String>()
}
