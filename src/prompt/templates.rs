//! Instruction text sent to the generative providers, one builder per workflow.
use crate::error::AppResult;
use crate::prompt::constructor::PromptConstructor;

pub const WALL_REFINE: &str = "Remove highlight line, seamless wall transition.";

pub const FLOOR_REFINE: &str = "Remove seams, preserve shadows, make flooring realistic.";

pub const DETECT_COLORS: &str = "\
Identify DISTINCT product colors only.
Ignore background, shadows, and highlights.
Return comma-separated color names.";

const FABRIC_RECOLOR: &str = "\
You are a professional textile color matching expert.

TASK:
- Change ONLY the {{color_target}} fabric in the FIRST image
- Match it EXACTLY to the fabric in the SECOND image

RULES:
- Preserve weave, texture, folds, lighting
- Do NOT modify non-fabric regions
- No smoothing, no hallucination

IMAGE ORDER:
1) Product Image
2) Fabric Reference";

const MODIFY_COLOR: &str = "\
Change ONLY regions with color {{source_color}} to {{target_color}}.
Preserve all textures, folds, shadows.
Do NOT alter background or other colors.";

const REPLACE_ACCESSORY: &str = "\
You are a professional image editor.

Task:
- Identify any accessory present in the image
- Remove it cleanly
- Replace it with: {{new_accessory}}

Rules:
- Keep placement realistic
- Match lighting and shadows
- Do NOT change the main product
- Do NOT alter background";

pub const ANALYZE_SETUP: &str = r#"Identify all distinct visible objects and fabrics.

Return STRICT JSON only.
No markdown.
No bullet points.
No extra text.

Format EXACTLY like this:
{
  "items": [
    "Table",
    "White tablecloth",
    "Green table runner"
  ]
}"#;

const REPLACE_OBJECT: &str = "\
Replace ONLY the object named:
\"{{item_name}}\"

Use the second image as replacement.
Keep background, lighting, shadows,
perspective and all other objects unchanged.
Maintain realism.";

pub fn fabric_recolor(color_target: &str) -> AppResult<String> {
    PromptConstructor::new().construct_prompt(FABRIC_RECOLOR, &[("color_target", color_target)])
}

pub fn modify_color(source_color: &str, target_color: &str) -> AppResult<String> {
    PromptConstructor::new()
        .construct_prompt(MODIFY_COLOR, &[("source_color", source_color), ("target_color", target_color)])
}

pub fn replace_accessory(new_accessory: &str) -> AppResult<String> {
    PromptConstructor::new().construct_prompt(REPLACE_ACCESSORY, &[("new_accessory", new_accessory)])
}

pub fn replace_object(item_name: &str) -> AppResult<String> {
    PromptConstructor::new().construct_prompt(REPLACE_OBJECT, &[("item_name", item_name)])
}
