use anyhow::{Context, Result};
use handlebars::{handlebars_helper, Handlebars};
use serde::Serialize;

#[derive(Debug, Clone)]
pub enum Format {
    Json,
    Text,
}

impl clap::ValueEnum for Format {
    fn value_variants<'a>() -> &'a [Self] {
        &[Self::Json, Self::Text]
    }

    fn to_possible_value(&self) -> Option<clap::builder::PossibleValue> {
        match self {
            Self::Json => Some(clap::builder::PossibleValue::new("json")),
            Self::Text => Some(clap::builder::PossibleValue::new("text")),
        }
    }
}

/// Display label for a header operating mode.
pub fn mode_label(mode: u64) -> String {
    match mode {
        1 => "Forward Wide Area".to_string(),
        2 => "Back Detection".to_string(),
        3 => "Forward Narrow Area".to_string(),
        4 => "Forward Tracking".to_string(),
        5 => "Dual Person Monitoring".to_string(),
        _ => format!("Unknown({mode})"),
    }
}

/// Display label for a header work status.
pub fn work_status_label(status: u64) -> String {
    match status {
        1 => "Normal".to_string(),
        2 => "Standby".to_string(),
        3 => "Abnormal".to_string(),
        _ => format!("Unknown({status})"),
    }
}

/// Display label for a target record status.
pub fn target_status_label(status: u64) -> String {
    match status {
        1 => "Normal".to_string(),
        2 => "Abnormal".to_string(),
        _ => format!("Unknown({status})"),
    }
}

fn setup_handlebars() -> Handlebars<'static> {
    let mut hb = Handlebars::new();
    hb.register_escape_fn(handlebars::no_escape);

    handlebars_helper!(mode: |v: u64| mode_label(v));
    handlebars_helper!(work_status: |v: u64| work_status_label(v));
    handlebars_helper!(target_status: |v: u64| target_status_label(v));
    handlebars_helper!(hexbytes: |arr: array| {
        arr.iter()
            .map(|v| format!("{:02x}", v.as_u64().unwrap_or_default()))
            .collect::<Vec<String>>()
            .join(" ")
    });
    handlebars_helper!(left_pad: |num: u64, v: Json| {
        let v = match v {
            serde_json::Value::String(s) => s.to_owned(),
            serde_json::Value::Null => String::new(),
            _ => v.to_string()
        };
        let num = usize::try_from(num).unwrap_or_default().max(v.len());
        format!("{v:>num$}")
    });

    hb.register_helper("mode", Box::new(mode));
    hb.register_helper("work_status", Box::new(work_status));
    hb.register_helper("target_status", Box::new(target_status));
    hb.register_helper("hex", Box::new(hexbytes));
    hb.register_helper("lpad", Box::new(left_pad));
    hb
}

/// A parsed handlebars template with the display helpers registered, reusable across
/// any number of renders.
pub struct TextRenderer {
    hb: Handlebars<'static>,
}

impl TextRenderer {
    const NAME: &'static str = "t";

    pub fn new(template: &str) -> Result<Self> {
        let mut hb = setup_handlebars();
        hb.register_template_string(Self::NAME, template)
            .context("registering template")?;
        Ok(TextRenderer { hb })
    }

    pub fn render<T: Serialize>(&self, data: &T) -> Result<String> {
        self.hb.render(Self::NAME, data).context("rendering text")
    }
}

/// Render `data` once with a handlebars `template`.
pub fn render_text<T: Serialize>(template: &str, data: &T) -> Result<String> {
    TextRenderer::new(template)?.render(data)
}
