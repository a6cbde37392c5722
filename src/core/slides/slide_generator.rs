use super::slide_models::{slide_deck_schema, SlideDeck, SlideStyle};
use super::slide_renderer::render_slide_html;
use crate::core::ai::{AiProvider, AiService};
use crate::core::tools::{LocalTool, ToolDefinition, ToolExecution};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub const SLIDE_GENERATOR_TOOL: &str = "GENERATE_PRESENTATION_SLIDES";

const DEFAULT_SLIDE_COUNT: u64 = 5;
const MAX_SLIDE_COUNT: u64 = 20;

/// Local tool that turns source content into a styled slide deck via
/// structured model output.
pub struct SlideGeneratorTool<P: AiProvider> {
    ai: Arc<AiService<P>>,
}

impl<P: AiProvider> SlideGeneratorTool<P> {
    pub fn new(ai: Arc<AiService<P>>) -> Self {
        Self { ai }
    }
}

fn build_prompt(content: &str, slide_count: u64, style: SlideStyle) -> String {
    let last_content_slide = slide_count.saturating_sub(1).max(1);
    format!(
        "Create a professional presentation with {count} slides using a {style} style, based on the following content:

---
{content}
---

CRITICAL CONTENT RULES:
- Base the presentation ENTIRELY on the provided content. Do not add outside information.
- NEVER use placeholder text like \"heading\", \"content\", \"bullet point\", etc.
- ALWAYS write actual, meaningful, specific content derived from the provided text.
- Each slide must have substantive, valuable information from the source content.

SLIDE STRUCTURE:
- Slide 1: Title slide with a compelling title and descriptive subtitle that summarizes the content.
- Slides 2-{last_content_slide}: Content slides with specific information, insights, or analysis from the source.
- Slide {count}: Strong conclusion with key takeaways and next steps based on the source.

SLIDE TYPES:
- Use \"title\" type for the first slide only.
- Use \"bullet\" for slides with multiple key points (3-5 bullets max).
- Use \"content\" for slides with detailed explanations.

Generate substantial, professional content that accurately reflects the provided text.",
        count = slide_count,
        style = style.as_str(),
        content = content,
        last_content_slide = last_content_slide,
    )
}

fn failure(message: String) -> ToolExecution {
    ToolExecution {
        data: json!({ "error": message }),
        error: Some(message),
        successful: false,
    }
}

#[async_trait]
impl<P: AiProvider + 'static> LocalTool for SlideGeneratorTool<P> {
    fn definition(&self) -> ToolDefinition {
        let styles: Vec<&str> = SlideStyle::ALL.iter().map(|s| s.as_str()).collect();
        ToolDefinition {
            slug: SLIDE_GENERATOR_TOOL.to_string(),
            name: "Generate Presentation Slides".to_string(),
            description: "Creates a professional presentation based on provided content, with customizable slide count and style.".to_string(),
            toolkit: Some(SLIDE_GENERATOR_TOOL.to_string()),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "The detailed content or data for the presentation. This should be a summary or the full text from which to generate slides."
                    },
                    "slideCount": {
                        "type": "integer",
                        "minimum": 1,
                        "maximum": MAX_SLIDE_COUNT,
                        "description": "Number of slides to generate (1-20)"
                    },
                    "style": {
                        "type": "string",
                        "enum": styles,
                        "description": "The visual style for the presentation."
                    }
                },
                "required": ["content"]
            }),
        }
    }

    async fn execute(&self, args: &Value) -> ToolExecution {
        let content = match args.get("content").and_then(Value::as_str) {
            Some(c) if !c.trim().is_empty() => c,
            _ => return failure("Failed to generate slides: content is required".to_string()),
        };
        let slide_count = args
            .get("slideCount")
            .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f.round() as u64)))
            .unwrap_or(DEFAULT_SLIDE_COUNT)
            .clamp(1, MAX_SLIDE_COUNT);
        let style = args
            .get("style")
            .and_then(Value::as_str)
            .map(SlideStyle::parse)
            .unwrap_or_default();

        tracing::info!(
            slide_count,
            style = style.as_str(),
            content_len = content.len(),
            "Generating presentation slides"
        );

        let prompt = build_prompt(content, slide_count, style);
        let raw = match self.ai.generate_object(&prompt, &slide_deck_schema()).await {
            Ok(value) => value,
            Err(e) => {
                tracing::error!("Slide generation failed: {}", e);
                return failure(format!("Failed to generate slides: {}", e));
            }
        };

        let mut deck: SlideDeck = match serde_json::from_value(raw) {
            Ok(deck) => deck,
            Err(e) => {
                tracing::error!("Slide generation returned an unexpected shape: {}", e);
                return failure(format!("Failed to generate slides: {}", e));
            }
        };

        for slide in &mut deck.slides {
            slide.html = Some(render_slide_html(slide, style));
        }

        let count = deck.slides.len();
        let topic = deck
            .slides
            .first()
            .map(|s| s.title.clone())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "Generated Presentation".to_string());

        ToolExecution::success(json!({
            "slides": deck.slides,
            "slideCount": count,
            "topic": topic,
            "style": style.as_str(),
            "message": format!("Successfully generated {} slides.", count),
        }))
    }
}
