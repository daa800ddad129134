// src/utils/html.rs

/// Sanitizes authored question text and options before they are stored.
///
/// Whitelist-based: safe formatting tags such as `<b>` or `<p>` survive, while
/// `<script>` (with its content), `<iframe>` and event-handler attributes are
/// removed. Students see this text verbatim in the exam view.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
