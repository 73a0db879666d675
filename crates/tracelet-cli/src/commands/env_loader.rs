use std::fs;
use std::path::PathBuf;

use tracelet_compiler::Config;
use tracelet_compiler::env::{Env, StaticTypeProvider};
use tracelet_core::StackMode;

pub struct EnvArgs {
    pub types_file: Option<PathBuf>,
    pub max_strlen: Option<usize>,
    pub stack_mode: Option<StackMode>,
    pub max_rounds: Option<u32>,
}

impl EnvArgs {
    /// Defaults overridden by whichever flags were given.
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        if let Some(max_strlen) = self.max_strlen {
            config = config.with_max_strlen(max_strlen);
        }
        if let Some(stack_mode) = self.stack_mode {
            config = config.with_stack_mode(stack_mode);
        }
        if let Some(max_rounds) = self.max_rounds {
            config = config.with_max_rounds(max_rounds);
        }
        config
    }
}

pub fn load_env(args: &EnvArgs) -> Result<Env, String> {
    let env = Env::new(args.config());
    let Some(path) = &args.types_file else {
        return Ok(env);
    };

    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    let provider = StaticTypeProvider::from_json(&text)
        .map_err(|e| format!("invalid type file '{}': {}", path.display(), e))?;
    tracing::debug!(path = %path.display(), "loaded type provider");
    let enums = provider.enum_defs();
    Ok(env.with_provider(provider).with_enums(enums))
}
