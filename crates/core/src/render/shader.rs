//! Shader compilation, program registry and buffer ownership.
//!
//! [`ShaderRuntime`] owns a backend plus every program and buffer created
//! through it. Programs are stored by name; creating a program under an
//! existing name replaces (and deletes) the old one. After [`dispose`]
//! every call fails with `RenderError::NotInitialized`.
//!
//! [`dispose`]: ShaderRuntime::dispose

use std::collections::HashMap;

use crate::encoding::TextureEncoding;
use crate::error::RenderError;

use super::backend::{BufferTarget, BufferUsage, GlBackend, ShaderStage};
use super::context::{ContextSource, ContextVersion};

/// Formats a shader compilation error for human-readable debugging.
///
/// Prepends right-aligned line numbers to each line of `source`, then
/// appends the driver's error `log`. This makes it easy to correlate
/// error messages (which reference line numbers) with the actual GLSL.
///
/// Both `source` and `log` may be empty; the function handles all
/// combinations gracefully.
pub fn format_shader_error(source: &str, log: &str) -> String {
    let source_lines: Vec<&str> = if source.is_empty() {
        Vec::new()
    } else {
        source.lines().collect()
    };

    let line_count = source_lines.len();
    let width = if line_count == 0 {
        1
    } else {
        line_count.to_string().len()
    };

    let numbered: String = source_lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>width$}: {line}", i + 1, width = width))
        .collect::<Vec<_>>()
        .join("\n");

    match (numbered.is_empty(), log.is_empty()) {
        (true, true) => String::new(),
        (true, false) => log.to_string(),
        (false, true) => numbered,
        (false, false) => format!("{numbered}\n\n{log}"),
    }
}

/// Compiles and links GLSL programs against one context.
pub struct ShaderRuntime<B: GlBackend> {
    backend: Option<B>,
    programs: HashMap<String, B::Program>,
    buffers: Vec<B::Buffer>,
}

impl<B: GlBackend> ShaderRuntime<B> {
    /// Acquires a WebGL2 backend, falling back to WebGL1.
    ///
    /// # Errors
    ///
    /// `RenderError::Unsupported` if the source offers neither.
    pub fn initialize<S>(source: &S) -> Result<Self, RenderError>
    where
        S: ContextSource<Backend = B>,
    {
        let backend = source
            .webgl2()
            .or_else(|| {
                log::info!("WebGL2 unavailable, trying WebGL1");
                source.webgl1()
            })
            .ok_or_else(|| RenderError::Unsupported("neither WebGL2 nor WebGL1 is available".into()))?;
        Ok(Self::with_backend(backend))
    }

    /// Wraps an already acquired backend.
    pub fn with_backend(backend: B) -> Self {
        let version = backend.version();
        let float = backend.supports_float_textures();
        log::info!("shader runtime on {version}, float textures: {float}");
        if !float {
            log::info!(
                "{} missing, field texture falls back to quantized bytes",
                version.float_texture_extension()
            );
        }
        Self {
            backend: Some(backend),
            programs: HashMap::new(),
            buffers: Vec::new(),
        }
    }

    /// The backend, unless disposed.
    ///
    /// # Errors
    ///
    /// `RenderError::NotInitialized` after [`dispose`](Self::dispose).
    pub fn backend(&self) -> Result<&B, RenderError> {
        self.backend.as_ref().ok_or(RenderError::NotInitialized)
    }

    pub fn version(&self) -> Result<ContextVersion, RenderError> {
        Ok(self.backend()?.version())
    }

    /// The field texture encoding this context can sample.
    pub fn texture_encoding(&self) -> Result<TextureEncoding, RenderError> {
        Ok(TextureEncoding::for_capability(
            self.backend()?.supports_float_textures(),
        ))
    }

    /// Compiles one stage.
    ///
    /// # Errors
    ///
    /// `RenderError::Compilation` with the line-numbered source and driver
    /// log; the failed shader object is deleted.
    pub fn compile_shader(&self, source: &str, stage: ShaderStage) -> Result<B::Shader, RenderError> {
        let backend = self.backend()?;
        let shader = backend
            .create_shader(stage)
            .map_err(|log| RenderError::Compilation {
                stage: stage.name().to_owned(),
                log,
            })?;

        if backend.compile_shader(shader, source) {
            Ok(shader)
        } else {
            let info_log = backend.shader_info_log(shader);
            backend.delete_shader(shader);
            Err(RenderError::Compilation {
                stage: stage.name().to_owned(),
                log: format_shader_error(source, &info_log),
            })
        }
    }

    /// Compiles both stages, links them and stores the program as `name`.
    ///
    /// Intermediate shader objects are deleted on every path. A previous
    /// program with the same name is deleted once the new one links.
    ///
    /// # Errors
    ///
    /// `RenderError::Compilation` or `RenderError::Link`.
    pub fn create_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
        name: &str,
    ) -> Result<B::Program, RenderError> {
        let vertex = self.compile_shader(vertex_source, ShaderStage::Vertex)?;
        let fragment = match self.compile_shader(fragment_source, ShaderStage::Fragment) {
            Ok(f) => f,
            Err(e) => {
                self.backend()?.delete_shader(vertex);
                return Err(e);
            }
        };

        let program = {
            let backend = self.backend()?;
            let linked = backend.create_program().and_then(|program| {
                if backend.link_program(program, vertex, fragment) {
                    Ok(program)
                } else {
                    let info_log = backend.program_info_log(program);
                    backend.delete_program(program);
                    Err(info_log)
                }
            });

            backend.delete_shader(vertex);
            backend.delete_shader(fragment);
            linked.map_err(|log| RenderError::Link(format!("{name}: {log}")))?
        };

        if let Some(old) = self.programs.insert(name.to_owned(), program) {
            self.backend()?.delete_program(old);
        }
        log::debug!("linked program '{name}'");
        Ok(program)
    }

    /// Uploads `data` as `f32` to a new buffer owned by the runtime.
    ///
    /// `target` and `usage` default to vertex attributes and static draw.
    ///
    /// # Errors
    ///
    /// `RenderError::Gpu` if the driver cannot allocate the buffer.
    pub fn create_buffer(
        &mut self,
        data: &[f32],
        target: Option<BufferTarget>,
        usage: Option<BufferUsage>,
    ) -> Result<B::Buffer, RenderError> {
        let bytes: Vec<u8> = data.iter().flat_map(|v| v.to_ne_bytes()).collect();
        let buffer = self
            .backend()?
            .create_buffer(target.unwrap_or_default(), usage.unwrap_or_default(), &bytes)
            .map_err(RenderError::Gpu)?;
        self.buffers.push(buffer);
        Ok(buffer)
    }

    /// The program stored as `name`.
    pub fn program(&self, name: &str) -> Option<B::Program> {
        self.programs.get(name).copied()
    }

    fn require_program(&self, name: &str) -> Result<B::Program, RenderError> {
        self.program(name)
            .ok_or_else(|| RenderError::Validation(format!("program '{name}' not found")))
    }

    /// Runs driver-side validation of `name`.
    ///
    /// # Errors
    ///
    /// `RenderError::Validation` if the program is missing or invalid.
    pub fn validate_program(&self, name: &str) -> Result<(), RenderError> {
        let backend = self.backend()?;
        let program = self.require_program(name)?;
        if backend.validate_program(program) {
            Ok(())
        } else {
            Err(RenderError::Validation(format!(
                "{name}: {}",
                backend.program_info_log(program)
            )))
        }
    }

    /// Location of `uniform` in program `name`; `None` if the driver
    /// optimized it away.
    ///
    /// # Errors
    ///
    /// `RenderError::Validation` if the program is missing.
    pub fn get_uniform_location(
        &self,
        name: &str,
        uniform: &str,
    ) -> Result<Option<B::UniformLocation>, RenderError> {
        let backend = self.backend()?;
        let program = self.require_program(name)?;
        Ok(backend.uniform_location(program, uniform))
    }

    /// Location of vertex attribute `attribute` in program `name`.
    ///
    /// # Errors
    ///
    /// `RenderError::Validation` if the program is missing or lacks the attribute.
    pub fn get_attrib_location(&self, name: &str, attribute: &str) -> Result<u32, RenderError> {
        let backend = self.backend()?;
        let program = self.require_program(name)?;
        backend.attrib_location(program, attribute).ok_or_else(|| {
            RenderError::Validation(format!("{name}: attribute '{attribute}' not active"))
        })
    }

    /// Makes `name` the current program.
    ///
    /// # Errors
    ///
    /// `RenderError::Validation` if the program is missing.
    pub fn use_program(&self, name: &str) -> Result<(), RenderError> {
        let backend = self.backend()?;
        backend.use_program(Some(self.require_program(name)?));
        Ok(())
    }

    pub fn is_disposed(&self) -> bool {
        self.backend.is_none()
    }

    /// Deletes every program and buffer and drops the backend. Idempotent.
    pub fn dispose(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };
        backend.use_program(None);
        for (_, program) in self.programs.drain() {
            backend.delete_program(program);
        }
        for buffer in self.buffers.drain(..) {
            backend.delete_buffer(buffer);
        }
        log::debug!("shader runtime disposed");
    }
}
