//! Print the OpenAPI document of the quiz server to stdout.

use anyhow::Context;
use buzzer_quiz::services::documentation::ApiDoc;
use utoipa::OpenApi;

fn main() -> anyhow::Result<()> {
    let doc = ApiDoc::openapi()
        .to_pretty_json()
        .context("serialising OpenAPI document")?;
    println!("{doc}");
    Ok(())
}
