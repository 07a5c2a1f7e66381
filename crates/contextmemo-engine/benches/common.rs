// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
#[allow(dead_code)]
pub fn generate_article(paragraphs: usize) -> String {
    let mut html = String::from("<html><head><title>Bench</title></head><body><article>\n");
    for i in 0..paragraphs {
        html.push_str(&format!(
            "  <p id=\"p{i}\">Paragraph {i} has <b>some bold</b> text,\n    an <a href=\"#\">inline link</a> and a closing sentence.</p>\n"
        ));
    }
    html.push_str("</article></body></html>");
    html
}

/// Marker phrase placed once, near the end of the generated page.
#[allow(dead_code)]
pub const NEEDLE: &str = "needle phrase in the haystack";

#[allow(dead_code)]
pub fn generate_article_with_needle(paragraphs: usize) -> String {
    let article = generate_article(paragraphs);
    article.replace(
        "</article>",
        &format!("<p>Just before the end, the {NEEDLE} appears.</p></article>"),
    )
}
