//! HTML pages rendered with `MiniJinja`.
//!
//! Templates are compiled into the binary. `.html` templates auto-escape
//! their variables.

use minijinja::Environment;
use serde::Serialize;

/// Upper bound on template execution steps.
const FUEL_LIMIT: u64 = 50_000;

pub const UPLOAD_PAGE: &str = "upload.html";
pub const SHARE_PAGE: &str = "share.html";
pub const VIEW_PAGE: &str = "view.html";
pub const EXPIRED_PAGE: &str = "expired.html";

/// The compiled page templates.
#[derive(Debug)]
pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    /// Compile the embedded templates.
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.set_fuel(Some(FUEL_LIMIT));
        env.add_template(UPLOAD_PAGE, include_str!("../templates/upload.html"))?;
        env.add_template(SHARE_PAGE, include_str!("../templates/share.html"))?;
        env.add_template(VIEW_PAGE, include_str!("../templates/view.html"))?;
        env.add_template(EXPIRED_PAGE, include_str!("../templates/expired.html"))?;
        Ok(Self { env })
    }

    /// Render the named page with `ctx`.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(ctx)
    }
}

/// Context for the share page shown after an upload.
#[derive(Debug, Serialize)]
pub struct ShareContext<'a> {
    pub link: &'a str,
    /// `data:` URI preview, absent when the upload could not be decoded.
    pub thumbnail: Option<&'a str>,
    pub view_seconds: u64,
    pub unviewed_minutes: u64,
}

/// Context for the countdown page.
#[derive(Debug, Serialize)]
pub struct ViewContext<'a> {
    pub image_url: &'a str,
    pub duration: f64,
    pub time_remaining: f64,
    pub first_view: bool,
}
