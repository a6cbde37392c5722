//! HTML and markdown rendering for generated slides.
//!
//! Every slide is rendered as a self-contained fragment: a scoped `<style>`
//! block followed by the slide markup, so fragments can be dropped into any
//! page without leaking styles.

use super::slide_models::{ColorScheme, Slide, SlideKind, SlideStyle};

fn base_css(colors: &ColorScheme) -> String {
    format!(
        r#"
    .slide-container {{
      --slide-primary: {primary}; --slide-secondary: {secondary};
      width: 100%; height: 100%; isolation: isolate;
    }}
    .slide-container * {{ margin: 0; padding: 0; box-sizing: border-box; }}
    .slide-container .slide {{
      width: 100%; height: 100%; min-height: 500px;
      background: {background}; color: {text};
      font-family: 'SF Pro Display', -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
      display: flex; flex-direction: column; justify-content: center; align-items: center;
      padding: 40px; position: relative; overflow: hidden;
    }}
    .slide-container .slide::before {{
      content: ''; position: absolute; top: 0; left: 0; right: 0; bottom: 0;
      background: rgba(0, 0, 0, 0.1); z-index: 1;
    }}
    .slide-container .slide-content {{
      position: relative; z-index: 2; text-align: center; max-width: 800px; width: 100%;
    }}
    .slide-container h1 {{
      font-size: 3rem; font-weight: 700; margin-bottom: 1.5rem; line-height: 1.2; letter-spacing: -0.025em;
    }}
    .slide-container h2 {{
      font-size: 2.5rem; font-weight: 600; margin-bottom: 1.5rem; line-height: 1.2; letter-spacing: -0.025em;
    }}
    .slide-container .subtitle {{ font-size: 1.25rem; font-weight: 400; opacity: 0.9; margin-bottom: 2rem; }}
    .slide-container .content-card {{
      background: {card_bg}; color: {card_text};
      padding: 2rem; border-radius: 16px;
      box-shadow: 0 20px 40px rgba(0,0,0,0.1), 0 10px 20px rgba(0,0,0,0.05);
      margin-top: 2rem; text-align: left;
    }}
    .slide-container .content-card p {{ font-size: 0.95rem; line-height: 1.6; margin-bottom: 1rem; }}
    .slide-container .bullets {{ list-style: none; padding: 0; margin: 0; }}
    .slide-container .bullets li {{
      font-size: 0.95rem; line-height: 1.6; margin-bottom: 1rem; padding-left: 2rem; position: relative;
    }}
    .slide-container .bullets li::before {{
      content: '•'; color: {accent}; font-size: 1.5rem; position: absolute; left: 0; top: 0;
    }}
    .slide-container .slide-number {{
      position: absolute; bottom: 20px; right: 20px; font-size: 0.9rem; opacity: 0.7; z-index: 3;
    }}
  "#,
        primary = colors.primary,
        secondary = colors.secondary,
        background = colors.background,
        text = colors.text,
        card_bg = colors.card_bg,
        card_text = colors.card_text,
        accent = colors.accent,
    )
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn wrap(inner: &str) -> String {
    format!(
        r#"<div class="slide-container"><div class="slide"><div class="slide-content">{}</div></div></div>"#,
        inner
    )
}

pub fn render_slide_html(slide: &Slide, style: SlideStyle) -> String {
    let title = escape_html(&slide.title);

    let inner = match slide.kind {
        SlideKind::Title => {
            let subtitle = if slide.content.trim().is_empty() {
                String::new()
            } else {
                format!(r#"<p class="subtitle">{}</p>"#, escape_html(&slide.content))
            };
            format!("<h1>{}</h1>{}", title, subtitle)
        }
        SlideKind::Bullet => {
            let bullets = match &slide.bullet_points {
                Some(points) => {
                    let items: String = points
                        .iter()
                        .map(|p| format!("<li>{}</li>", escape_html(p)))
                        .collect();
                    format!(r#"<ul class="bullets">{}</ul>"#, items)
                }
                None => String::new(),
            };
            format!(r#"<h2>{}</h2><div class="content-card">{}</div>"#, title, bullets)
        }
        SlideKind::Content => format!(
            r#"<h2>{}</h2><div class="content-card"><p>{}</p></div>"#,
            title,
            escape_html(&slide.content)
        ),
    };

    format!("<style>{}</style>{}", base_css(&style.colors()), wrap(&inner))
}

/// Markdown form used by the Google Slides markdown importer.
///
/// A slide's body is its `content`, or its bullet points one per line when
/// the content is empty. Slides are separated by horizontal rules.
pub fn slides_to_markdown(slides: &[Slide]) -> String {
    slides
        .iter()
        .map(|slide| {
            let body = if !slide.content.is_empty() {
                slide.content.clone()
            } else {
                slide
                    .bullet_points
                    .as_ref()
                    .map(|points| points.join("\n"))
                    .unwrap_or_default()
            };
            format!("# {}\n\n{}", slide.title, body)
        })
        .collect::<Vec<_>>()
        .join("\n\n---\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slide(kind: SlideKind, title: &str, content: &str, bullets: Option<&[&str]>) -> Slide {
        Slide {
            title: title.to_string(),
            content: content.to_string(),
            kind,
            bullet_points: bullets.map(|b| b.iter().map(|s| s.to_string()).collect()),
            html: None,
        }
    }

    #[test]
    fn test_title_slide_has_h1_and_subtitle() {
        let html = render_slide_html(
            &slide(SlideKind::Title, "Roadmap", "Where we go next", None),
            SlideStyle::Professional,
        );
        assert!(html.starts_with("<style>"));
        assert!(html.contains("<h1>Roadmap</h1>"));
        assert!(html.contains(r#"<p class="subtitle">Where we go next</p>"#));
        assert!(html.contains("#667eea"));
    }

    #[test]
    fn test_title_slide_without_content_has_no_subtitle() {
        let html = render_slide_html(&slide(SlideKind::Title, "Hi", "", None), SlideStyle::Minimal);
        assert!(!html.contains("subtitle\">"));
    }

    #[test]
    fn test_bullet_slide_uses_accent_color() {
        let html = render_slide_html(
            &slide(SlideKind::Bullet, "Wins", "", Some(&["One", "Two"])),
            SlideStyle::Creative,
        );
        assert!(html.contains(r#"<ul class="bullets"><li>One</li><li>Two</li></ul>"#));
        assert!(html.contains("color: #38a169"));
        assert!(html.contains("<h2>Wins</h2>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let html = render_slide_html(
            &slide(SlideKind::Content, "<script>", "a & b", None),
            SlideStyle::Academic,
        );
        assert!(html.contains("<h2>&lt;script&gt;</h2>"));
        assert!(html.contains("<p>a &amp; b</p>"));
    }

    #[test]
    fn test_markdown_joins_slides_with_rules() {
        let slides = vec![
            slide(SlideKind::Title, "Deck", "Subtitle", None),
            slide(SlideKind::Bullet, "Points", "", Some(&["- a", "- b"])),
            slide(SlideKind::Bullet, "Summary", "Prose wins", Some(&["unused"])),
        ];
        assert_eq!(
            slides_to_markdown(&slides),
            "# Deck\n\nSubtitle\n\n---\n\n# Points\n\n- a\n- b\n\n---\n\n# Summary\n\nProse wins"
        );
    }
}
