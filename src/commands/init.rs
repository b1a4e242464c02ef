//! The init command handler.

use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the home directory, the configuration files and an empty database.
pub async fn init(home: &Path) -> Result<Out<()>> {
    let config = Config::create(home).await?;
    Ok(Out::new_message(format!(
        "Initialized expenses home at {}",
        config.root().display()
    )))
}
