/// Worker harness generation.
///
/// The harness is the trusted Python driver written into each workspace next
/// to the rewritten submission. It configures the headless backend, installs
/// the restricted import resolver (enforced for imports issued from the
/// submission namespace, so allowed libraries keep resolving their own
/// internals), seeds the execution namespace with the plotting handles and a
/// curated builtins table, and converts any submission
/// exception into a traceback on stderr plus a non-zero exit. All of that
/// state is worker-process-local: nothing in the host mutates, and the
/// restriction dies with the worker on every exit path.
use crate::config::SandboxConfig;

/// File names used inside the workspace
pub const HARNESS_FILE: &str = "harness.py";
pub const SUBMISSION_FILE: &str = "submission.py";

const TEMPLATE: &str = r#"# Generated by plotbox; executes one rewritten submission.
import sys
import builtins
import traceback

import matplotlib
matplotlib.use("Agg")
import matplotlib.pyplot as plt
import matplotlib.font_manager as fm

_ALLOWED_MODULES = @ALLOWED_MODULES@

_real_import = builtins.__import__

# The submission executes against this exact dict; the import guard keys on
# its identity, so allowed libraries keep importing their own internals while
# every import issued from submission code goes through the allow-list.
_user_namespace = {}


def _guarded_import(name, globals=None, locals=None, fromlist=(), level=0):
    if globals is not _user_namespace:
        return _real_import(name, globals, locals, fromlist, level)
    allowed = name in _ALLOWED_MODULES or any(
        name.startswith(prefix + ".") for prefix in _ALLOWED_MODULES
    )
    if not allowed:
        raise ImportError(
            "import of module '%s' is not allowed in the sandbox" % name
        )
    return _real_import(name, globals, locals, fromlist, level)


_DENIED_BUILTINS = {
    "open", "eval", "exec", "compile", "globals", "locals", "vars",
    "input", "breakpoint", "exit", "quit", "help",
}
_safe_builtins = {
    name: value
    for name, value in vars(builtins).items()
    if name not in _DENIED_BUILTINS
}
_safe_builtins["__import__"] = _guarded_import

_sequence = [0]


def _plotbox_flush():
    for number in plt.get_fignums():
        _sequence[0] += 1
        path = "plot_%03d.png" % _sequence[0]
        plt.figure(number).savefig(path, dpi=@DPI@, bbox_inches="tight")
        print("Saved plot to %s" % path)
    plt.close("all")


def _main():
    with open("submission.py", "r") as handle:
        source = handle.read()
    _user_namespace.update({
        "plt": plt,
        "matplotlib": matplotlib,
        "fm": fm,
        "_plotbox_flush": _plotbox_flush,
        "__name__": "__main__",
        "__file__": "submission.py",
        "__builtins__": _safe_builtins,
    })
    builtins.__import__ = _guarded_import
    try:
        code = compile(source, "submission.py", "exec")
        exec(code, _user_namespace)
    except BaseException:
        traceback.print_exc()
        sys.exit(1)
    finally:
        builtins.__import__ = _real_import
        plt.close("all")


_main()
"#;

/// Render the harness source for the configured allow-list and resolution
pub fn render(config: &SandboxConfig) -> String {
    let allowed = config
        .allowed_modules
        .iter()
        .map(|m| format!("\"{}\"", m))
        .collect::<Vec<_>>()
        .join(", ");

    TEMPLATE
        .replace("@ALLOWED_MODULES@", &format!("{{{}}}", allowed))
        .replace("@DPI@", &config.dpi.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_injects_allow_list_and_dpi() {
        let config = SandboxConfig {
            dpi: 144,
            ..SandboxConfig::default()
        };
        let harness = render(&config);
        assert!(harness.contains("\"matplotlib.pyplot\""));
        assert!(harness.contains("\"numpy\""));
        assert!(harness.contains("dpi=144"));
        assert!(!harness.contains("@ALLOWED_MODULES@"));
        assert!(!harness.contains("@DPI@"));
    }

    #[test]
    fn test_render_uses_headless_backend() {
        let harness = render(&SandboxConfig::default());
        assert!(harness.contains("matplotlib.use(\"Agg\")"));
        // Backend selection must precede the pyplot import
        let use_at = harness.find("matplotlib.use").unwrap();
        let pyplot_at = harness.find("import matplotlib.pyplot").unwrap();
        assert!(use_at < pyplot_at);
    }

    #[test]
    fn test_render_restricts_user_builtins() {
        let harness = render(&SandboxConfig::default());
        for denied in ["\"open\"", "\"eval\"", "\"exec\"", "\"compile\""] {
            assert!(harness.contains(denied), "missing denied builtin {}", denied);
        }
        assert!(harness.contains("_guarded_import"));
    }
}
