use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;

use boa_engine::{vm::RuntimeLimits, Context, Source};
use tracing::{debug, warn};

use crate::config::SandboxConfig;
use crate::error::SandboxError;

/// The opaque value type ferried across the sandbox boundary: contract
/// environment bindings going in, captured contract data coming out. A
/// plain JSON value is the statically-typed stand-in for "whatever the
/// sandboxed language's objects hold": null, bool, number, string, array,
/// and string-keyed object all map directly onto it.
pub type Value = serde_json::Value;

/// The base class every contract extends, plus the reflection helper used
/// to recover a deployed contract's own method names and source text.
const PREDEFINED_CLASSES: &str = include_str!("predefined.js");

/// One exported method recovered from a deployed contract: its name (for
/// deploy-time validation by the caller) and its verbatim source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSource {
    pub name: String,
    pub source: String,
}

/// Result of evaluating contract-deployment source.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployOutcome {
    pub data: Value,
    pub methods: Vec<MethodSource>,
}

/// Result of invoking a method on a reconstructed contract instance.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeOutcome {
    pub data: Value,
}

/// A deterministic, resource-capped host for contract source. Stateless
/// beyond its configured limits. Every call spins up a fresh engine
/// context on a throwaway worker thread, so one execution can never
/// observe another's state.
#[derive(Debug, Clone, Copy)]
pub struct Sandbox {
    config: SandboxConfig,
}

impl Sandbox {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Evaluate `predefined_classes` followed by `user_source` with `env`
    /// bound as global identifiers, then capture the `exports` instance's
    /// own data and the source text of its own methods.
    pub fn deploy(
        &self,
        user_source: &str,
        env: &BTreeMap<String, Value>,
    ) -> Result<DeployOutcome, SandboxError> {
        let mut setup = env_preamble(env);
        setup.push_str(PREDEFINED_CLASSES);
        setup.push('\n');
        setup.push_str(user_source);
        setup.push_str(
            "\nif (typeof exports === 'undefined' || exports === null) { throw new Error('no exports'); }\n",
        );

        let tail = "JSON.stringify({ data: exports, methods: __reflectOwnMethods(exports) })";
        let json = self.run_isolated(setup, tail)?;
        self.check_data_budget(&json)?;

        #[derive(serde::Deserialize)]
        struct Envelope {
            data: Value,
            methods: Vec<RawMethod>,
        }
        #[derive(serde::Deserialize)]
        struct RawMethod {
            name: String,
            src: String,
        }

        let envelope: Envelope =
            serde_json::from_str(&json).map_err(|_| SandboxError::BadDefinition)?;
        let methods = envelope
            .methods
            .into_iter()
            .map(|m| MethodSource {
                name: m.name,
                source: m.src,
            })
            .collect();
        Ok(DeployOutcome {
            data: envelope.data,
            methods,
        })
    }

    /// Splice `code` (method source texts joined by `separator`) into a
    /// fresh class body extending `Base`, instantiate it, assign `data`
    /// onto the instance, then invoke `invocation` (`"method(args)"`, or
    /// empty for `_default`).
    pub fn invoke(
        &self,
        code: &str,
        separator: &str,
        data: &Value,
        invocation: &str,
        env: &BTreeMap<String, Value>,
    ) -> Result<InvokeOutcome, SandboxError> {
        let class_body = code.replace(separator, "\n");
        let data_literal = serde_json::to_string(data).map_err(|_| SandboxError::BadDefinition)?;

        let mut setup = env_preamble(env);
        setup.push_str(PREDEFINED_CLASSES);
        setup.push('\n');
        setup.push_str("class __Contract extends Base {\n");
        setup.push_str(&class_body);
        setup.push_str("\n}\n");
        setup.push_str("const __instance = new __Contract();\n");
        setup.push_str("Object.assign(__instance, ");
        setup.push_str(&data_literal);
        setup.push_str(");\n");

        let call = if invocation.is_empty() {
            "__instance._default();\n".to_string()
        } else {
            format!("__instance.{invocation};\n")
        };
        setup.push_str(&call);

        let tail = "JSON.stringify(__instance)";
        let json = self.run_isolated(setup, tail)?;
        self.check_data_budget(&json)?;
        let data: Value = serde_json::from_str(&json).map_err(|_| SandboxError::BadDefinition)?;
        Ok(InvokeOutcome { data })
    }

    fn check_data_budget(&self, encoded: &str) -> Result<(), SandboxError> {
        if encoded.len() > self.config.max_data_bytes {
            return Err(SandboxError::DataTooLarge {
                max: self.config.max_data_bytes,
            });
        }
        Ok(())
    }

    /// Run `setup_source` then `tail_expr` to completion inside a fresh
    /// engine context on a dedicated worker thread, returning the tail
    /// expression's result coerced to a string (conventionally a
    /// `JSON.stringify` payload).
    ///
    /// The engine's own loop/recursion limits are the first line of
    /// defense against a runaway script. The `recv_timeout` below is the
    /// second, wall-clock one. A script that evades both leaves its worker
    /// thread running detached, bounded in practice by the loop-iteration
    /// cap, never by the caller waiting on it.
    fn run_isolated(&self, setup_source: String, tail_expr: &'static str) -> Result<String, SandboxError> {
        let config = self.config;
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            let outcome = Self::eval_in_context(&setup_source, tail_expr, &config);
            let _ = tx.send(outcome);
        });

        match rx.recv_timeout(config.timeout) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(timeout_ms = config.timeout.as_millis() as u64, "sandbox execution timed out");
                Err(SandboxError::Timeout(config.timeout))
            }
        }
    }

    fn eval_in_context(
        setup_source: &str,
        tail_expr: &str,
        config: &SandboxConfig,
    ) -> Result<String, SandboxError> {
        let mut limits = RuntimeLimits::default();
        limits.set_loop_iteration_limit(config.loop_iteration_limit);
        limits.set_recursion_limit(config.recursion_limit);
        limits.set_stack_size_limit(config.stack_size_limit);

        let mut context = Context::default();
        context.set_runtime_limits(limits);

        context
            .eval(Source::from_bytes(setup_source))
            .map_err(|e| SandboxError::Script(e.to_string()))?;

        let result = context
            .eval(Source::from_bytes(tail_expr))
            .map_err(|e| SandboxError::Script(e.to_string()))?;

        let text = result
            .to_string(&mut context)
            .map_err(|e| SandboxError::Script(e.to_string()))?
            .to_std_string_escaped();
        debug!(bytes = text.len(), "sandbox execution completed");
        Ok(text)
    }
}

/// Render `env` as `const name = <json literal>;` bindings, one per line,
/// in key order (deterministic regardless of caller-side map iteration).
fn env_preamble(env: &BTreeMap<String, Value>) -> String {
    let mut out = String::new();
    for (name, value) in env {
        out.push_str("const ");
        out.push_str(name);
        out.push_str(" = ");
        out.push_str(&serde_json::to_string(value).unwrap_or_else(|_| "null".to_string()));
        out.push_str(";\n");
    }
    out
}
