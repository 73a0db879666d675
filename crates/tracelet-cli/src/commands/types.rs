use serde::Serialize;
use tracelet_compiler::Analysis;

use super::env_loader::EnvArgs;
use super::run_common::{analyze_or_exit, exit_with};
use super::script_loader::ScriptArgs;

pub struct TypesArgs {
    pub script: ScriptArgs,
    pub env: EnvArgs,
    pub json: bool,
    pub color: bool,
}

#[derive(Debug, Serialize)]
pub struct TypeTable {
    pub maps: Vec<MapEntry>,
    pub variables: Vec<VariableEntry>,
}

#[derive(Debug, Serialize)]
pub struct MapEntry {
    pub name: String,
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
pub struct VariableEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl TypeTable {
    pub fn new(analysis: &Analysis) -> Self {
        let ast = &analysis.ast;
        let maps = analysis
            .resolve
            .map_types
            .iter()
            .map(|(name, types)| MapEntry {
                name: ast.name(*name).to_string(),
                key: types.key.to_string(),
                value: types.value.to_string(),
            })
            .collect();
        let variables = analysis
            .variable_types()
            .into_iter()
            .map(|(name, ty)| VariableEntry {
                name,
                ty: ty.to_string(),
            })
            .collect();
        Self { maps, variables }
    }

    /// Aligned plain-text table.
    pub fn render(&self) -> String {
        let width = self
            .maps
            .iter()
            .map(|m| m.name.len())
            .chain(self.variables.iter().map(|v| v.name.len()))
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for map in &self.maps {
            out.push_str(&format!(
                "{:width$}  [{}] -> {}\n",
                map.name, map.key, map.value
            ));
        }
        for var in &self.variables {
            out.push_str(&format!("{:width$}  {}\n", var.name, var.ty));
        }
        out
    }
}

pub fn run(args: TypesArgs) {
    let (_, analysis, _) = analyze_or_exit(&args.script, &args.env, args.color);
    let table = TypeTable::new(&analysis);

    if args.json {
        let json = serde_json::to_string_pretty(&table).unwrap_or_else(|e| exit_with(&e.to_string()));
        println!("{}", json);
    } else {
        print!("{}", table.render());
    }
}
