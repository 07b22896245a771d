use std::path::{Path, PathBuf};

use indoc::indoc;
use minicc::{
    driver::{CompilationOutput, compile, compile_path},
    frontend::SourceFile,
    middle::{
        diagnostic::DiagnosticKind,
        ir::pretty_print::render_module_plain,
        optimization::{FunctionOutcome, Pass, PipelineConfig},
    },
};
use pretty_assertions::assert_eq;

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn compile_fixture(name: &str) -> CompilationOutput {
    match compile_path(&fixture(name), &PipelineConfig::default()) {
        Ok((_, output)) => output,
        Err((_, error)) => panic!("{name} failed to compile: {error}"),
    }
}

fn optimize_fixture(name: &str) -> String {
    let output = compile_fixture(name);

    assert!(output.is_ready_for_codegen(), "{:?}", output.diagnostics);
    render_module_plain(&output.module)
}

fn diagnostics(name: &str) -> Vec<(DiagnosticKind, usize)> {
    compile_fixture(name)
        .diagnostics
        .all()
        .into_iter()
        .map(|diagnostic| (diagnostic.kind, diagnostic.line()))
        .collect()
}

#[test]
fn algebraic_identities() {
    assert_eq!(
        optimize_fixture("algebraic_identities.c"),
        indoc! {"
            int main() {
                int x;
                int y;
                int z;
                int result1;
                int result2;
                int result3;
                int result4;
                int result5;
                int result6;
                int result7;
                int result8;
                x = 10;
                y = 5;
                result1 = 10;
                result2 = 10;
                result3 = 10;
                result4 = 10;
                result5 = 0;
                result6 = -10;
                result7 = 10 + z;
                result8 = 10;
                return 30 + result7 + 10;
            }
        "}
    );
}

#[test]
fn constant_propagation() {
    assert_eq!(
        optimize_fixture("constant_propagation.c"),
        indoc! {"
            int main() {
                int a;
                int b;
                int c;
                int d;
                int x;
                int y;
                int z;
                int result1;
                int result2;
                int result3;
                int result4;
                a = 5;
                b = 5;
                c = 8;
                x = 10;
                y = 10;
                z = 10;
                result1 = 20;
                d = 7;
                result2 = 4;
                result3 = 49;
                result4 = 12;
                a = 15;
                b = 16;
                return 101;
            }
        "}
    );
}

#[test]
fn copy_propagation_folds_to_a_single_literal() {
    let optimized = optimize_fixture("copy_propagation.c");

    assert!(optimized.contains("    b = 42;\n    result2 = 84;\n"));
    assert!(optimized.contains("    e = 42;\n    result3 = 32;\n"));
    assert!(optimized.contains("    b = 999;\n    c = 1998;\n"));
    assert!(optimized.ends_with("    return 3214;\n}\n"), "{optimized}");
}

#[test]
fn dead_stores_can_be_removed_on_request() {
    let config = PipelineConfig {
        passes: [Pass::ALL.as_slice(), &[Pass::DeadStoreElimination]].concat(),
        ..PipelineConfig::default()
    };
    let Ok((_, output)) = compile_path(&fixture("copy_propagation.c"), &config) else {
        panic!("fixture failed to compile");
    };

    assert_eq!(
        render_module_plain(&output.module),
        "int main() {\n    return 3214;\n}\n"
    );
}

#[test]
fn optimized_output_is_a_fixpoint() {
    let once = optimize_fixture("copy_propagation.c");
    let output = compile(&SourceFile::new_in_memory(once.clone()), &PipelineConfig::default())
        .unwrap();

    assert_eq!(render_module_plain(&output.module), once);
    assert!(matches!(
        output.report.functions.as_slice(),
        [(_, FunctionOutcome::Optimized { rounds: 1 })]
    ));
}

#[test]
fn structured_program() {
    assert_eq!(
        optimize_fixture("structured.c"),
        indoc! {"
            int globalVar = 10;
            float pi = 3.14;

            int add(int a, int b) {
                int result = a + b;
                return result;
            }

            int checkValue(int x) {
                if (x > 5) {
                    return 1;
                } else {
                    return 0;
                }
            }

            int countUp(int limit) {
                int count = 0;
                int i = 0;
                while (i < limit) {
                    count = count + 1;
                    i = i + 1;
                }
                return count;
            }

            int main() {
                int localVar = 20;
                int sum = add(20, 10);
                if (sum > 25) {
                    int result = checkValue(sum);
                    return result;
                } else {
                    return countUp(5);
                }
            }
        "}
    );
}

#[test]
fn every_initializer_mismatch_is_reported() {
    assert_eq!(
        diagnostics("initializer_mismatch.c"),
        vec![
            (DiagnosticKind::InitializerTypeMismatch, 3),
            (DiagnosticKind::InitializerTypeMismatch, 4),
            (DiagnosticKind::InitializerTypeMismatch, 5),
        ]
    );
}

#[test]
fn comparison_mismatches_are_reported() {
    assert_eq!(
        diagnostics("comparison_mismatch.c"),
        vec![
            (DiagnosticKind::ComparisonTypeMismatch, 11),
            (DiagnosticKind::ComparisonTypeMismatch, 15),
        ]
    );
}

#[test]
fn mixing_int_and_char_is_reported_once() {
    let output = compile_fixture("operand_mismatch.c");

    assert_eq!(
        diagnostics("operand_mismatch.c"),
        vec![(DiagnosticKind::BinaryOperandTypeMismatch, 12)]
    );
    assert_eq!(
        output.report.functions.iter().map(|(_, outcome)| outcome).collect::<Vec<_>>(),
        vec![&FunctionOutcome::Skipped]
    );
    // Skipped functions are left exactly as written
    assert!(render_module_plain(&output.module).contains("    result = a * b + c;\n"));
}

#[test]
fn diagnostics_render_against_the_source() {
    let path = fixture("initializer_mismatch.c");
    let Ok((source, output)) = compile_path(&path, &PipelineConfig::default()) else {
        panic!("fixture failed to compile");
    };

    let rendered = strip_ansi_escapes::strip_str(output.diagnostics.all()[1].render(&source));

    assert!(
        rendered.starts_with("error: initializer type int does not match declared type char of `grade`"),
        "{rendered}"
    );
    assert!(rendered.contains(&format!("{}:4:5", path.display())), "{rendered}");
    assert!(rendered.contains("4 |     char grade = 95;"), "{rendered}");
}
