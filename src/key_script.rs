use anyhow::Context;
use serde::Deserialize;
use std::{fs, path::Path};
use winit::keyboard::KeyCode;

#[derive(Debug, Deserialize)]
struct KeyScriptFile {
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawStep {
    at_ms: u64,
    key: String,
    #[serde(default = "default_pressed")]
    pressed: bool,
}

fn default_pressed() -> bool {
    true
}

/// One scheduled key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyStep {
    pub at_ms: u64,
    pub key: KeyCode,
    pub pressed: bool,
}

/// Replays key presses and releases at fixed offsets from the start of play.
pub struct KeyScriptPlayer {
    steps: Vec<KeyStep>,
    next: usize,
}

impl KeyScriptPlayer {
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read key script {}", path.display()))?;
        Self::from_json(&contents)
            .with_context(|| format!("invalid key script {}", path.display()))
    }

    pub fn from_json(contents: &str) -> anyhow::Result<Self> {
        let file: KeyScriptFile = serde_json::from_str(contents)?;
        if file.steps.is_empty() {
            anyhow::bail!("key script contains no steps");
        }

        let mut steps = file
            .steps
            .into_iter()
            .map(|raw| {
                let key = parse_key(&raw.key)
                    .with_context(|| format!("unknown key {:?} at {} ms", raw.key, raw.at_ms))?;
                Ok(KeyStep {
                    at_ms: raw.at_ms,
                    key,
                    pressed: raw.pressed,
                })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        // Stable, so steps sharing a timestamp keep file order.
        steps.sort_by_key(|step| step.at_ms);

        Ok(Self { steps, next: 0 })
    }

    /// Steps that became due by `elapsed_ms`, each returned once.
    pub fn advance(&mut self, elapsed_ms: u64) -> &[KeyStep] {
        let start = self.next;
        while self
            .steps
            .get(self.next)
            .is_some_and(|step| step.at_ms <= elapsed_ms)
        {
            self.next += 1;
        }
        &self.steps[start..self.next]
    }
}

/// Key names accepted in scripts: winit key code names plus short aliases.
fn parse_key(name: &str) -> Option<KeyCode> {
    match name.to_ascii_lowercase().as_str() {
        "w" | "keyw" => Some(KeyCode::KeyW),
        "s" | "keys" => Some(KeyCode::KeyS),
        "up" | "arrowup" => Some(KeyCode::ArrowUp),
        "down" | "arrowdown" => Some(KeyCode::ArrowDown),
        "space" => Some(KeyCode::Space),
        "escape" | "esc" => Some(KeyCode::Escape),
        _ => None,
    }
}
