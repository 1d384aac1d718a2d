//! Program Writer
//!
//! Serializes a [`Program`] to GLSL source using the minijinja template
//! engine. The template (`shaders/program.glsl`) owns the layout of the file;
//! this module prepares declarations and statements.
//!
//! ## Output layout
//!
//! 1. header comment and `#version` directive
//! 2. library dependencies, inlined or as `#include` lines
//! 3. uniforms, then stage inputs and outputs
//! 4. `main()` with locals followed by the atoms in `(group, counter)` order
//!
//! Vertex outputs and fragment inputs are renamed to a shared `v<Semantic>_<n>`
//! form so the two stages link by name. The projective position becomes
//! `gl_Position`; for GLSL ES the fragment colour outputs become
//! `gl_FragColor` / `gl_FragData[n]`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use loom_core::{LoomError, ResolveError, Result};
use minijinja::value::{Object, Value};
use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::function::FunctionInvocation;
use crate::parameter::{Parameter, ParameterUsage, Semantic};
use crate::program::{Program, ProgramSet, ProgramType};

static WRITER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

const PROGRAM_TEMPLATE: &str = "program.glsl";

#[derive(RustEmbed)]
#[folder = "src/shaders"]
struct ShaderAssets;

fn get_env() -> &'static Environment<'static> {
    WRITER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);
        env.set_loader(template_loader);
        env.add_function("next_loc", next_location);

        env
    })
}

fn template_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    Ok(embedded_text(name))
}

fn embedded_text(path: &str) -> Option<String> {
    let file = ShaderAssets::get(path)?;
    std::str::from_utf8(file.data.as_ref())
        .ok()
        .map(str::to_string)
}

/// Source of an embedded shader library, e.g. `FFPLib_Common`.
#[must_use]
pub fn library_source(name: &str) -> Option<String> {
    embedded_text(&format!("libraries/{name}.glsl"))
}

fn next_location(allocator: &LocationAllocator) -> u32 {
    allocator.next()
}

/// Hands out consecutive `layout(location = N)` indices during one render.
#[derive(Debug, Default)]
struct LocationAllocator {
    counter: AtomicU32,
}

impl LocationAllocator {
    fn next(&self) -> u32 {
        self.counter.fetch_add(1, Ordering::Relaxed)
    }
}

impl Object for LocationAllocator {
    fn call_method(
        self: &Arc<Self>,
        _state: &minijinja::State,
        name: &str,
        _args: &[Value],
    ) -> std::result::Result<Value, Error> {
        if name == "next" {
            Ok(Value::from(self.next()))
        } else {
            Err(Error::new(
                ErrorKind::UnknownMethod,
                format!("method {name} not found"),
            ))
        }
    }
}

// ─── Target Language ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TargetLanguage {
    #[default]
    #[serde(rename = "glsl330")]
    Glsl330,
    #[serde(rename = "glsles100")]
    GlslEs100,
}

impl TargetLanguage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Glsl330 => "glsl330",
            Self::GlslEs100 => "glsles100",
        }
    }

    #[must_use]
    pub const fn version_directive(self) -> &'static str {
        match self {
            Self::Glsl330 => "#version 330 core",
            Self::GlslEs100 => "#version 100",
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_es(self) -> bool {
        matches!(self, Self::GlslEs100)
    }
}

// ─── Template Context ────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ProgramContext {
    stage: &'static str,
    language: &'static str,
    version: &'static str,
    es: bool,
    libraries: Vec<LibraryBlock>,
    uniforms: Vec<String>,
    inputs: Vec<Declaration>,
    outputs: Vec<Declaration>,
    locals: Vec<String>,
    statements: Vec<String>,
    loc: Value,
}

#[derive(Serialize)]
struct LibraryBlock {
    name: &'static str,
    source: Option<String>,
}

#[derive(Serialize)]
struct Declaration {
    qualifier: &'static str,
    ty: &'static str,
    name: String,
    located: bool,
}

/// Source text of a whole program set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSource {
    pub vertex: String,
    pub fragment: String,
    pub geometry: Option<String>,
}

// ─── ProgramWriter ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgramWriter {
    language: TargetLanguage,
    inline_libraries: bool,
}

impl ProgramWriter {
    #[must_use]
    pub const fn new(language: TargetLanguage, inline_libraries: bool) -> Self {
        Self {
            language,
            inline_libraries,
        }
    }

    #[inline]
    #[must_use]
    pub fn language(&self) -> TargetLanguage {
        self.language
    }

    pub fn write_program_set(&self, programs: &ProgramSet) -> Result<GeneratedSource> {
        Ok(GeneratedSource {
            vertex: self.write_program(programs.vertex())?,
            fragment: self.write_program(programs.fragment())?,
            geometry: programs
                .geometry()
                .map(|program| self.write_program(program))
                .transpose()?,
        })
    }

    pub fn write_program(&self, program: &Program) -> Result<String> {
        let program_type = program.program_type();
        if program_type == ProgramType::Geometry && self.language.is_es() {
            return Err(LoomError::UnsupportedStage {
                language: self.language.as_str(),
                stage: program_type.as_str(),
            });
        }

        let entry = program.entry_function();
        let mut renames: FxHashMap<&str, String> = FxHashMap::default();
        for &id in entry.inputs().iter().chain(entry.outputs()) {
            let parameter = program.parameter(id);
            if let Some(name) = self.emitted_name(program_type, parameter) {
                renames.insert(parameter.name(), name);
            }
        }
        let emitted = |parameter: &Parameter| {
            renames
                .get(parameter.name())
                .cloned()
                .unwrap_or_else(|| parameter.name().to_string())
        };

        let libraries = program
            .dependencies()
            .map(|name| {
                let source = if self.inline_libraries {
                    Some(library_source(name).ok_or_else(|| ResolveError::MissingLibrary(name.to_string()))?)
                } else {
                    None
                };
                Ok(LibraryBlock { name, source })
            })
            .collect::<Result<Vec<_>>>()?;

        let uniforms = program
            .uniforms()
            .map(|(_, p)| format!("uniform {} {};", p.ty().glsl_name(), p.name()))
            .collect();

        let es = self.language.is_es();
        let inputs = entry
            .inputs()
            .iter()
            .map(|&id| {
                let p = program.parameter(id);
                Declaration {
                    qualifier: match (program_type, es) {
                        (ProgramType::Vertex, true) => "attribute",
                        (_, true) => "varying",
                        (_, false) => "in",
                    },
                    ty: p.ty().glsl_name(),
                    name: emitted(p),
                    located: program_type == ProgramType::Vertex && !es,
                }
            })
            .collect();

        let outputs = entry
            .outputs()
            .iter()
            .map(|&id| program.parameter(id))
            .map(|p| (p, emitted(p)))
            .filter(|(_, name)| !name.starts_with("gl_"))
            .map(|(p, name)| Declaration {
                qualifier: if es { "varying" } else { "out" },
                ty: p.ty().glsl_name(),
                name,
                located: program_type == ProgramType::Fragment && !es,
            })
            .collect();

        let locals = entry
            .locals()
            .iter()
            .map(|&id| {
                let p = program.parameter(id);
                format!("{} {};", p.ty().glsl_name(), p.name())
            })
            .collect();

        let statements = entry
            .sorted_invocations()
            .into_iter()
            .map(|atom| format_invocation(atom, &renames))
            .collect();

        let ctx = ProgramContext {
            stage: program_type.as_str(),
            language: self.language.as_str(),
            version: self.language.version_directive(),
            es,
            libraries,
            uniforms,
            inputs,
            outputs,
            locals,
            statements,
            loc: Value::from_object(LocationAllocator::default()),
        };

        let template = get_env()
            .get_template(PROGRAM_TEMPLATE)
            .map_err(|e| LoomError::Template(e.to_string()))?;
        template
            .render(&ctx)
            .map_err(|e| LoomError::Template(e.to_string()))
    }

    fn emitted_name(&self, program_type: ProgramType, parameter: &Parameter) -> Option<String> {
        let varying = || {
            Some(format!(
                "v{}_{}",
                parameter.semantic().name_fragment(),
                parameter.index()
            ))
        };
        match (program_type, parameter.usage()) {
            (ProgramType::Vertex, ParameterUsage::Output) => {
                if parameter.semantic() == Semantic::Position {
                    Some("gl_Position".to_string())
                } else {
                    varying()
                }
            }
            (ProgramType::Fragment, ParameterUsage::Input) => varying(),
            (ProgramType::Fragment, ParameterUsage::Output) if self.language.is_es() => {
                match parameter.index() {
                    0 => Some("gl_FragColor".to_string()),
                    n => Some(format!("gl_FragData[{n}]")),
                }
            }
            _ => None,
        }
    }
}

fn format_invocation(atom: &FunctionInvocation, renames: &FxHashMap<&str, String>) -> String {
    let mut line = String::with_capacity(64);
    line.push_str(atom.function_name());
    line.push('(');
    for (i, operand) in atom.operands().iter().enumerate() {
        if i > 0 {
            line.push_str(", ");
        }
        let name = renames
            .get(operand.name())
            .map_or(operand.name(), String::as_str);
        operand.push_as(name, &mut line);
    }
    line.push_str(");");
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Operand;
    use crate::parameter::{AutoConstantType, Content};
    use crate::types::GpuConstantType;

    fn transform_program() -> Program {
        let mut program = Program::new(ProgramType::Vertex);
        let wvp = program.resolve_auto_parameter(AutoConstantType::WorldViewProjMatrix, 0);
        let pos_in = program
            .resolve_input_parameter(
                Semantic::Position,
                0,
                Content::PositionObjectSpace,
                GpuConstantType::Float4,
            )
            .unwrap();
        let pos_out = program
            .resolve_output_parameter(
                Semantic::Position,
                Some(0),
                Content::PositionProjectiveSpace,
                GpuConstantType::Float4,
            )
            .unwrap();
        program.add_dependency("FFPLib_Transform");
        let (a, b, c) = (program.op_in(wvp), program.op_in(pos_in), program.op_out(pos_out));
        program.stage(100).call("FFP_Transform", [a, b, c]);
        program
    }

    #[test]
    fn test_vertex_program_layout() {
        let writer = ProgramWriter::new(TargetLanguage::Glsl330, false);
        let source = writer.write_program(&transform_program()).unwrap();

        assert!(source.contains("#version 330 core"));
        assert!(source.contains("#include \"FFPLib_Transform.glsl\""));
        assert!(source.contains("uniform mat4 worldviewproj_matrix;"));
        assert!(source.contains("layout(location = 0) in vec4 iPos_0;"));
        assert!(source.contains("FFP_Transform(worldviewproj_matrix, iPos_0, gl_Position);"));
        assert!(!source.contains("oPos_0"));
    }

    #[test]
    fn test_inline_libraries_embed_source() {
        let writer = ProgramWriter::new(TargetLanguage::Glsl330, true);
        let source = writer.write_program(&transform_program()).unwrap();
        assert!(source.contains("// ---- FFPLib_Transform ----"));
        assert!(source.contains("void FFP_Transform("));
    }

    #[test]
    fn test_missing_library_is_a_resolution_error() {
        let mut program = transform_program();
        program.add_dependency("NoSuchLibrary");
        let writer = ProgramWriter::new(TargetLanguage::Glsl330, true);
        let err = writer.write_program(&program).unwrap_err();
        assert!(matches!(
            err,
            LoomError::Resolve(ResolveError::MissingLibrary(ref name)) if name == "NoSuchLibrary"
        ));
    }

    #[test]
    fn test_es_fragment_uses_frag_color() {
        let mut program = Program::new(ProgramType::Fragment);
        let colour = program
            .resolve_output_parameter(
                Semantic::Color,
                Some(0),
                Content::ColorDiffuse,
                GpuConstantType::Float4,
            )
            .unwrap();
        let out = program.op_out(colour);
        program.stage(0).assign(Operand::literal(1.0), out);

        let source = ProgramWriter::new(TargetLanguage::GlslEs100, false)
            .write_program(&program)
            .unwrap();
        assert!(source.contains("precision mediump float;"));
        assert!(source.contains("FFP_Assign(1.0, gl_FragColor);"));
    }

    #[test]
    fn test_es_rejects_geometry_programs() {
        let set = ProgramSet::new().with_geometry();
        let err = ProgramWriter::new(TargetLanguage::GlslEs100, false)
            .write_program_set(&set)
            .unwrap_err();
        assert!(matches!(err, LoomError::UnsupportedStage { .. }));
    }

    #[test]
    fn test_output_is_reproducible() {
        let writer = ProgramWriter::new(TargetLanguage::Glsl330, true);
        let a = writer.write_program(&transform_program()).unwrap();
        let b = writer.write_program(&transform_program()).unwrap();
        assert_eq!(a, b);
    }
}
