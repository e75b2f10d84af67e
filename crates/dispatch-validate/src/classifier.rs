//! Complexity classification: routes a validated program to the sandbox
//! executor (lightweight) or the cluster job manager (heavy).

use dispatch_ast::{calls, imports, with_calls, max_loop_nesting_depth, ParsedProgram};
use dispatch_domain::entities::ComplexityTag;

/// Data-processing libraries whose presence alone forces the heavy path.
const HEAVY_IMPORTS: &[&str] = &["pandas", "modin", "polars", "pyarrow", "dask", "ray", "pyspark"];

const FILE_OPERATIONS: &[&str] = &["open", "read", "write", "file"];
const FILE_MODULES: &[&str] = &["io", "pathlib"];

/// Loops nested this deep or deeper are classified heavy.
const COMPLEX_LOOP_DEPTH_THRESHOLD: usize = 3;

/// Classify an already-parsed program.
///
/// Heavy imports are checked first, then file I/O, then loop nesting -
/// matching the original decision order so the heavy-library check always
/// wins regardless of what else the program does.
pub fn classify(program: &ParsedProgram) -> ComplexityTag {
    if has_heavy_imports(program) {
        return ComplexityTag::Heavy;
    }
    if has_file_io(program) {
        return ComplexityTag::Heavy;
    }
    if max_loop_nesting_depth(program) >= COMPLEX_LOOP_DEPTH_THRESHOLD {
        return ComplexityTag::Heavy;
    }
    ComplexityTag::Lightweight
}

/// Parse `code` and classify it.
///
/// A program that fails to parse is classified lightweight: it will be
/// rejected by the syntax gate before classification ever matters in the
/// normal orchestration flow, but a caller invoking the classifier on its
/// own (outside that flow) still gets a defined answer rather than a parse
/// error surfacing from the wrong component.
pub fn classify_source(code: &str) -> ComplexityTag {
    match ParsedProgram::parse(code) {
        Ok(program) if !program.has_syntax_error() => classify(&program),
        _ => ComplexityTag::Lightweight,
    }
}

fn has_heavy_imports(program: &ParsedProgram) -> bool {
    imports(program)
        .iter()
        .any(|m| HEAVY_IMPORTS.contains(&m.root_module.as_str()))
}

fn has_file_io(program: &ParsedProgram) -> bool {
    let direct_call = calls(program).iter().any(|c| {
        c.callee
            .as_deref()
            .map(|callee| {
                let leaf = callee.rsplit('.').next().unwrap_or(callee);
                FILE_OPERATIONS.contains(&leaf)
            })
            .unwrap_or(false)
    });
    if direct_call {
        return true;
    }

    if with_calls(program).iter().any(|w| w.callee.as_deref() == Some("open")) {
        return true;
    }

    imports(program)
        .iter()
        .any(|m| FILE_MODULES.contains(&m.root_module.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify_str(source: &str) -> ComplexityTag {
        classify(&ParsedProgram::parse(source).unwrap())
    }

    #[test]
    fn plain_arithmetic_is_lightweight() {
        assert_eq!(classify_str("print(1 + 1)\n"), ComplexityTag::Lightweight);
    }

    #[test]
    fn pandas_import_is_heavy() {
        assert_eq!(classify_str("import pandas as pd\n"), ComplexityTag::Heavy);
    }

    #[test]
    fn file_io_is_heavy() {
        assert_eq!(classify_str("open('f.txt')\n"), ComplexityTag::Heavy);
        assert_eq!(
            classify_str("with open('f.txt') as f:\n    pass\n"),
            ComplexityTag::Heavy
        );
    }

    #[test]
    fn three_levels_of_nested_loops_is_heavy() {
        let source = "for i in range(3):\n    for j in range(3):\n        for k in range(3):\n            pass\n";
        assert_eq!(classify_str(source), ComplexityTag::Heavy);
    }

    #[test]
    fn two_levels_of_nested_loops_is_lightweight() {
        let source = "for i in range(3):\n    for j in range(3):\n        pass\n";
        assert_eq!(classify_str(source), ComplexityTag::Lightweight);
    }

    #[test]
    fn unparseable_code_defaults_to_lightweight() {
        assert_eq!(classify_source("def f(:\n"), ComplexityTag::Lightweight);
    }
}
