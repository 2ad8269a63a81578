//! The embedded metaschema.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::document::Document;
use crate::errors::LidyError;
use crate::schema::RuleSet;

const SOURCE: &str = include_str!("metaschema.yaml");

static RULES: OnceCell<Arc<RuleSet>> = OnceCell::new();

/// The metaschema as YAML text.
pub fn source() -> &'static str {
    SOURCE
}

/// The compiled metaschema, built on first use and shared by every parser afterwards.
pub fn rule_set() -> Result<&'static Arc<RuleSet>, LidyError> {
    RULES.get_or_try_init(|| {
        debug!("compiling metaschema");
        let document = Document::parse("metaschema.yaml", SOURCE)?;
        Ok::<_, LidyError>(Arc::new(RuleSet::compile(&document)?))
    })
}
