//! Running a snippet of DSL code as a throwaway app.
//!
//! The snippet is wrapped into a generated application whose inputs are read
//! from the command line arguments, compiled in the DSL's published tree and
//! run once. The value of the snippet is printed between two markers so it can
//! be told apart from everything else the runtime prints.

use std::{
    fmt::Write as _,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use delite_bench_cli_types::{CliInput, InputKind};
use itertools::Itertools;
use log::{debug, info};
use sha2::{Digest, Sha256};
use unindent::unindent;

use crate::executor::{CommandRunner, Invocation};

pub const BEGIN_OUTPUT_MARKER: &str = "[[BEGIN PROGRAM OUTPUT]]";
pub const END_OUTPUT_MARKER: &str = "[[END PROGRAM OUTPUT]]";

/// A typed value handed to the generated program.
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    Int(i64),
    Str(String),
    Float(f64),
}

impl InputValue {
    pub fn parse(kind: InputKind, value: &str) -> Result<InputValue> {
        Ok(match kind {
            InputKind::Int => InputValue::Int(
                value
                    .parse()
                    .with_context(|| format!("'{}' is not an integer", value))?,
            ),
            InputKind::Str => InputValue::Str(value.to_owned()),
            InputKind::Float => InputValue::Float(
                value
                    .parse()
                    .with_context(|| format!("'{}' is not a number", value))?,
            ),
        })
    }

    /// Reads argument `index` into a value named `name`.
    pub fn declaration(&self, name: &str, index: usize) -> String {
        match self {
            InputValue::Int(_) => format!("val {}: Rep[Int] = args({}).toInt", name, index),
            InputValue::Str(_) => format!("val {}: Rep[String] = args({})", name, index),
            InputValue::Float(_) => {
                format!("val {}: Rep[Double] = args({}).toDouble", name, index)
            }
        }
    }

    /// The value as passed on the command line of the run.
    pub fn argument(&self) -> String {
        match self {
            InputValue::Int(value) => value.to_string(),
            // Quoted once for each shell the argument passes through before it reaches the JVM.
            InputValue::Str(value) => escape_string(&escape_string(&escape_string(value))),
            InputValue::Float(value) if value.is_infinite() => {
                let text = if value.is_sign_positive() {
                    "Infinity"
                } else {
                    "-Infinity"
                };
                text.to_owned()
            }
            InputValue::Float(value) => value.to_string(),
        }
    }
}

/// Double quote `s`, escaping backslashes and double quotes.
pub fn escape_string(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedInput {
    pub name: String,
    pub value: InputValue,
}

impl TryFrom<&CliInput> for NamedInput {
    type Error = anyhow::Error;

    fn try_from(input: &CliInput) -> Result<Self> {
        if !is_identifier(&input.name) {
            bail!("Input name '{}' is not a valid identifier", input.name);
        }
        Ok(NamedInput {
            name: input.name.clone(),
            value: InputValue::parse(input.kind, &input.value)
                .with_context(|| format!("Invalid value for input '{}'", input.name))?,
        })
    }
}

/// Naming conventions of a DSL's generated application classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDsl {
    pub name: String,
}

impl InlineDsl {
    pub fn new(name: &str) -> InlineDsl {
        InlineDsl {
            name: name.to_owned(),
        }
    }

    fn namespace(&self) -> String {
        self.name.to_lowercase()
    }

    pub fn published_dir(&self, root: &Path) -> PathBuf {
        root.join("published").join(&self.name)
    }

    pub fn source_dir(&self, root: &Path) -> PathBuf {
        self.published_dir(root)
            .join("apps")
            .join("src")
            .join("python-generated")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InlineProgram {
    /// Hex digest identifying the program; generated class names derive from it.
    pub hash: String,
    pub source: String,
    pub inputs: Vec<NamedInput>,
}

impl InlineProgram {
    pub fn generate(dsl: &InlineDsl, code: &str, inputs: Vec<NamedInput>) -> InlineProgram {
        let declarations = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| input.value.declaration(&input.name, index))
            .collect_vec();

        let mut hasher = Sha256::new();
        hasher.update(code.as_bytes());
        for declaration in &declarations {
            hasher.update(declaration.as_bytes());
        }
        let hash = hex::encode(&hasher.finalize()[..16]);

        let name = format!("Py{}", hash);
        let ns = dsl.namespace();
        let dsl_name = &dsl.name;

        let mut source = unindent(&format!(
            r#"
            // generated for inline program {hash}

            import {ns}.compiler._
            import {ns}.library._
            import {ns}.shared._

            object {name}Compiler extends {dsl_name}ApplicationCompiler with {name}
            object {name}Interpreter extends {dsl_name}ApplicationInterpreter with {name}
            trait {name} extends {dsl_name}Application {{
              def main() = {{
            "#
        ));
        for declaration in &declarations {
            let _ = writeln!(source, "    {}", declaration);
        }
        source.push('\n');
        source.push_str("    val inline_return_value = {\n");
        for line in code.lines() {
            let _ = writeln!(source, "      {}", line);
        }
        source.push_str("    }\n\n");
        let epilogue = unindent(&format!(
            r#"
            println("{BEGIN_OUTPUT_MARKER}")
            println(inline_return_value)
            println("{END_OUTPUT_MARKER}")
            "#
        ));
        for line in epilogue.lines() {
            let _ = writeln!(source, "    {}", line);
        }
        source.push_str("  }\n}\n");

        InlineProgram {
            hash,
            source,
            inputs,
        }
    }

    pub fn name(&self) -> String {
        format!("Py{}", self.hash)
    }

    pub fn compiler_class(&self) -> String {
        format!("{}Compiler", self.name())
    }

    pub fn run_command(&self) -> String {
        std::iter::once(format!("bin/delite {}", self.compiler_class()))
            .chain(self.inputs.iter().map(|input| input.value.argument()))
            .join(" ")
    }
}

/// The text printed between the output markers, if both are present.
pub fn extract_program_output(output: &str) -> Option<&str> {
    let (_, rest) = output.split_once(&format!("{}\n", BEGIN_OUTPUT_MARKER))?;
    let (value, _) = rest.split_once(&format!("\n{}", END_OUTPUT_MARKER))?;
    Some(value)
}

/// Write, compile and run `program`, returning what it printed as its value.
pub fn run_inline<R: CommandRunner>(
    root: &Path,
    dsl: &InlineDsl,
    program: &InlineProgram,
    runner: &mut R,
) -> Result<String> {
    let source_dir = dsl.source_dir(root);
    fs::create_dir_all(&source_dir)
        .with_context(|| format!("Failed to create {}", source_dir.display()))?;
    let source_path = source_dir.join(format!("{}.scala", program.name()));
    fs::write(&source_path, &program.source)
        .with_context(|| format!("Failed to write {}", source_path.display()))?;
    info!("Generated {}", source_path.display());

    let steps = [
        ("sbt", "sbt compile".to_owned()),
        ("delitec", format!("bin/delitec {}", program.compiler_class())),
        ("delite", program.run_command()),
    ];

    let mut last_stdout = None;
    for (step, command) in steps {
        let invocation = Invocation {
            command,
            working_dir: dsl.published_dir(root),
            envs: Vec::new(),
            stdout: source_dir.join(format!("{}.{}.out", program.name(), step)),
            stderr: source_dir.join(format!("{}.{}.err", program.name(), step)),
        };
        debug!("{}: {}", step, invocation.command);
        let success = runner
            .execute(&invocation)
            .with_context(|| format!("Failed to execute '{}'", invocation.command))?;
        if !success {
            bail!(
                "'{}' failed, see {}",
                invocation.command,
                invocation.stderr.display()
            );
        }
        last_stdout = Some(invocation.stdout);
    }

    let stdout = last_stdout.ok_or_else(|| anyhow!("No program was run"))?;
    let output = fs::read_to_string(&stdout)
        .with_context(|| format!("Failed to read {}", stdout.display()))?;
    extract_program_output(&output)
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("No program output found in {}", stdout.display()))
}
