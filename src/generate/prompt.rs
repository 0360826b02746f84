//! Prompt construction for LLM-driven composition

use crate::catalog::{Catalog, LoudnessLevel};

/// Volume ranges for each layer of a composition
pub const BASE_LAYER_VOLUME: (f64, f64) = (0.15, 0.30);
pub const MAIN_LAYER_VOLUME: (f64, f64) = (0.35, 0.55);
pub const ACCENT_LAYER_VOLUME: (f64, f64) = (0.25, 0.45);

fn range(r: (f64, f64)) -> String {
    format!("{:.2}-{:.2}", r.0, r.1)
}

/// System prompt briefing the model on the library and composition rules
pub fn system_prompt(catalog: &Catalog) -> String {
    let loudness_rules: String = [
        LoudnessLevel::VerySoft,
        LoudnessLevel::Soft,
        LoudnessLevel::Medium,
        LoudnessLevel::Loud,
    ]
    .iter()
    .map(|level| {
        format!(
            "- {} source -> volume {}\n",
            level,
            range(level.suggested_volume())
        )
    })
    .collect();

    format!(
        r#"You are an ambient soundscape composer. The user describes a scene; pick clips from the sound library below and arrange them into a layered, breathing mix that is plausible for that environment.

{library}
## Environment
- Only use sounds that belong in the scene (no waves in an inland forest, no birdsong in heavy rain, night scenes use night sounds).
- Indoor scenes may hear outdoor sounds from a distance: lower their volume.

## Layers
| layer  | role                         | volume | timing                          |
|--------|------------------------------|--------|---------------------------------|
| base   | defines the space, always on | {base} | full length, long fades         |
| main   | carries the scene            | {main} | most of the piece               |
| accent | adds life and variation      | {accent} | appears intermittently        |

Use 1-2 base, 1-3 main and 1-3 accent clips; 4-7 tracks in total.

## Timing
- Never start every track at 0 or end them all together.
- Base layers enter first with 15-30s fade_in; main layers join 10-30s apart.
- Accent clips should not loop for the whole piece: give them short windows, or repeat the same clip in several windows.
- Let some tracks fade out before the end; the last one gets a 20-40s fade_out.

## Volume by source loudness
{loudness_rules}
Distant sounds sit around 0.1-0.3. Avoid two similar sounds at high volume together.

## Fades
- base: fade_in 15-30s, main: 8-15s, accent: 3-8s.
- fade_out equals fade_in for steady sounds, up to twice as long for sounds that die away.

## Output
Reply with a single YAML code block and nothing else:

```yaml
name: short evocative title
description: one sentence about the mood
duration: total seconds (300-600 recommended)
tracks:
  - audio: file-name.mp3
    start: seconds
    end: seconds
    volume: 0.1-1.0
    fade_in: seconds
    fade_out: seconds
    loop: true/false
```"#,
        library = catalog.prompt_summary(),
        base = range(BASE_LAYER_VOLUME),
        main = range(MAIN_LAYER_VOLUME),
        accent = range(ACCENT_LAYER_VOLUME),
        loudness_rules = loudness_rules,
    )
}

/// User message for a scene description
pub fn user_prompt(scene: &str) -> String {
    format!(
        "Compose a soundscape for the following scene:\n\n{}",
        scene.trim()
    )
}
