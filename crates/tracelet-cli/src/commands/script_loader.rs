use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

pub struct ScriptArgs {
    pub path: Option<PathBuf>,
    pub text: Option<String>,
}

/// A script's text and the name diagnostics refer to it by.
pub struct Script {
    pub name: String,
    pub text: String,
}

pub fn load_script(args: &ScriptArgs) -> Result<Script, String> {
    if let Some(text) = &args.text {
        return Ok(Script {
            name: "<expr>".to_string(),
            text: text.clone(),
        });
    }

    let Some(path) = &args.path else {
        return Err("script is required: use positional argument or -e/--expr".to_string());
    };
    if path.as_os_str() == "-" {
        let mut text = String::new();
        io::stdin()
            .read_to_string(&mut text)
            .map_err(|e| format!("failed to read stdin: {}", e))?;
        return Ok(Script {
            name: "<stdin>".to_string(),
            text,
        });
    }

    let text = fs::read_to_string(path)
        .map_err(|e| format!("failed to read '{}': {}", path.display(), e))?;
    Ok(Script {
        name: path.display().to_string(),
        text,
    })
}
