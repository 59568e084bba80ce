use std::path::Path;

use log::info;
use serde_json::json;
use strata::{Compiler, Options};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let compiler = Compiler::new(Options {
        basedir: Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"),
        ..Options::default()
    });
    let templates = compiler.compile_directory().await?;
    info!("compiled {} templates", templates.len());

    let html = templates.render(
        "pages/index.html",
        &json!({
            "site": "Strata",
            "user": {"name": "King Tubby", "roles": ["admin", "editor"]},
            "posts": [
                {"title": "Dub <basics>", "views": 1200},
                {"title": "Echo chambers", "views": 87},
            ],
        }),
    )?;
    println!("{html}");

    let html2 = templates.render("pages/about.html", &json!({"site": "Strata"}))?;
    println!("{html2}");
    Ok(())
}
