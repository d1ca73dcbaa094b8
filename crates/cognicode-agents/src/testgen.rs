//! Test case generation from function records.

use crate::rules::{call_count, is_recursive};
use cognicode_core::{FunctionInfo, FunctionKind, Language, TestCase, TestKind};
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framework {
    Jest,
    Pytest,
    JUnit,
    Generic,
}

impl Framework {
    fn for_language(language: &Language) -> Self {
        match language {
            Language::JavaScript | Language::TypeScript => Framework::Jest,
            Language::Python => Framework::Pytest,
            Language::Java => Framework::JUnit,
            Language::Other(_) => Framework::Generic,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Framework::Jest => "jest",
            Framework::Pytest => "pytest",
            Framework::JUnit => "junit",
            Framework::Generic => "generic",
        }
    }
}

struct Draft {
    name: String,
    description: String,
    kind: TestKind,
    code: String,
    expected: &'static str,
    priority: u8,
    data: Option<serde_json::Value>,
}

impl Draft {
    fn finish(self, framework: Framework) -> TestCase {
        TestCase {
            name: self.name,
            description: self.description,
            kind: self.kind,
            code: self.code,
            expected_result: self.expected.to_string(),
            framework: framework.name().to_string(),
            priority: self.priority,
            test_data: self.data,
        }
    }
}

/// Sample arguments `1, 2, ...` matching the parameter count.
fn sample_args(function: &FunctionInfo) -> String {
    (1..=function.parameters.len())
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn none_args(function: &FunctionInfo, none: &str) -> String {
    vec![none; function.parameters.len().max(1)].join(", ")
}

pub fn generate_tests(code: &str, language: &Language, functions: &[FunctionInfo]) -> Vec<TestCase> {
    let framework = Framework::for_language(language);
    let mut drafts = Vec::new();

    for function in functions {
        match function.kind {
            FunctionKind::Class => drafts.extend(class_tests(framework, function)),
            FunctionKind::Function => {
                drafts.extend(function_tests(framework, function));
                if is_recursive(code, function) {
                    drafts.push(performance_test(framework, function));
                }
                if *language == Language::TypeScript {
                    drafts.push(type_safety_test(function));
                }
            }
        }
    }
    drafts.extend(integration_tests(framework, code, functions));

    drafts.into_iter().map(|draft| draft.finish(framework)).collect()
}

fn function_tests(framework: Framework, f: &FunctionInfo) -> Vec<Draft> {
    let name = &f.name;
    let args = sample_args(f);
    let data = Some(json!({ "parameters": f.parameters }));

    match framework {
        Framework::Jest => {
            let mut drafts = vec![
                Draft {
                    name: format!("{} should be defined", name),
                    description: format!("Verifies that {} exists and is callable", name),
                    kind: TestKind::Unit,
                    code: format!(
                        "test('{name} should be defined', () => {{\n  expect(typeof {name}).toBe('function');\n}});"
                    ),
                    expected: "pass",
                    priority: 9,
                    data: None,
                },
                Draft {
                    name: format!("{} returns a value for typical input", name),
                    description: format!("Calls {} with representative arguments", name),
                    kind: TestKind::Unit,
                    code: format!(
                        "test('{name} returns a value for typical input', () => {{\n  expect({name}({args})).toBeDefined();\n}});"
                    ),
                    expected: "pass",
                    priority: 8,
                    data: data.clone(),
                },
            ];
            if !f.parameters.is_empty() {
                drafts.push(Draft {
                    name: format!("{} handles boundary values", name),
                    description: format!("Calls {} with zero and empty values", name),
                    kind: TestKind::EdgeCase,
                    code: format!(
                        "test('{name} handles boundary values', () => {{\n  expect(() => {name}({zeros})).not.toThrow();\n}});",
                        zeros = none_args(f, "0")
                    ),
                    expected: "pass",
                    priority: 6,
                    data: data.clone(),
                });
                drafts.push(Draft {
                    name: format!("{} handles invalid input", name),
                    description: format!("Calls {} with null arguments", name),
                    kind: TestKind::Negative,
                    code: format!(
                        "test('{name} handles invalid input', () => {{\n  expect(() => {name}({nulls})).not.toThrow(TypeError);\n}});",
                        nulls = none_args(f, "null")
                    ),
                    expected: "pass",
                    priority: 5,
                    data,
                });
            }
            drafts
        }
        Framework::Pytest => {
            let mut drafts = vec![
                Draft {
                    name: format!("test_{}_exists", name),
                    description: format!("Verifies that {} is callable", name),
                    kind: TestKind::Unit,
                    code: format!("def test_{name}_exists():\n    assert callable({name})"),
                    expected: "pass",
                    priority: 9,
                    data: None,
                },
                Draft {
                    name: format!("test_{}_basic", name),
                    description: format!("Calls {} with representative arguments", name),
                    kind: TestKind::Unit,
                    code: format!(
                        "def test_{name}_basic():\n    result = {name}({args})\n    assert result is not None"
                    ),
                    expected: "pass",
                    priority: 8,
                    data: data.clone(),
                },
            ];
            if !f.parameters.is_empty() {
                drafts.push(Draft {
                    name: format!("test_{}_handles_none", name),
                    description: format!("Passes None to {}", name),
                    kind: TestKind::Negative,
                    code: format!(
                        "def test_{name}_handles_none():\n    with pytest.raises((TypeError, ValueError)):\n        {name}({nones})",
                        nones = none_args(f, "None")
                    ),
                    expected: "raises",
                    priority: 6,
                    data,
                });
            }
            drafts
        }
        Framework::JUnit => {
            let method = capitalize(name);
            vec![
                Draft {
                    name: format!("test{}", method),
                    description: format!("Calls {} with representative arguments", name),
                    kind: TestKind::Unit,
                    code: format!(
                        "@Test\nvoid test{method}() {{\n    assertDoesNotThrow(() -> {name}({args}));\n}}"
                    ),
                    expected: "pass",
                    priority: 8,
                    data,
                },
                Draft {
                    name: format!("test{}Boundary", method),
                    description: format!("Calls {} with boundary values", name),
                    kind: TestKind::EdgeCase,
                    code: format!(
                        "@Test\nvoid test{method}Boundary() {{\n    assertDoesNotThrow(() -> {name}({zeros}));\n}}",
                        zeros = none_args(f, "0")
                    ),
                    expected: "pass",
                    priority: 6,
                    data: None,
                },
            ]
        }
        Framework::Generic => vec![Draft {
            name: format!("test_{}", name),
            description: format!("Basic test for {}", name),
            kind: TestKind::Unit,
            code: format!("// call {name}({args}) and check the result"),
            expected: "pass",
            priority: 5,
            data,
        }],
    }
}

fn class_tests(framework: Framework, class: &FunctionInfo) -> Vec<Draft> {
    let name = &class.name;
    let code = match framework {
        Framework::Jest => format!(
            "test('{name} can be instantiated', () => {{\n  expect(new {name}()).toBeInstanceOf({name});\n}});"
        ),
        Framework::Pytest => format!(
            "def test_{lower}_instantiation():\n    assert isinstance({name}(), {name})",
            lower = name.to_lowercase()
        ),
        Framework::JUnit => format!(
            "@Test\nvoid test{name}Instantiation() {{\n    assertNotNull(new {name}());\n}}"
        ),
        Framework::Generic => format!("// construct {name} and check the instance"),
    };

    vec![Draft {
        name: format!("{} can be instantiated", name),
        description: format!("Constructs {} with default arguments", name),
        kind: TestKind::Unit,
        code,
        expected: "pass",
        priority: 8,
        data: None,
    }]
}

fn performance_test(framework: Framework, f: &FunctionInfo) -> Draft {
    let name = &f.name;
    let code = match framework {
        Framework::Jest => format!(
            "test('{name} completes quickly for larger input', () => {{\n  const start = Date.now();\n  {name}(25);\n  expect(Date.now() - start).toBeLessThan(1000);\n}});"
        ),
        Framework::Pytest => format!(
            "def test_{name}_performance():\n    import time\n    start = time.perf_counter()\n    {name}(25)\n    assert time.perf_counter() - start < 1.0"
        ),
        Framework::JUnit => format!(
            "@Test\nvoid test{upper}Performance() {{\n    assertTimeout(Duration.ofSeconds(1), () -> {name}(25));\n}}",
            upper = capitalize(name)
        ),
        Framework::Generic => format!("// time {name}(25) and keep it under one second"),
    };

    Draft {
        name: format!("{} completes quickly for larger input", name),
        description: format!("{} is recursive; guards against exponential running time", name),
        kind: TestKind::Performance,
        code,
        expected: "completes within 1s",
        priority: 4,
        data: Some(json!({ "input": 25, "max_millis": 1000 })),
    }
}

fn type_safety_test(f: &FunctionInfo) -> Draft {
    let name = &f.name;
    Draft {
        name: format!("{} keeps its declared types", name),
        description: format!("Compile-time check of {}'s signature", name),
        kind: TestKind::Unit,
        code: format!(
            "test('{name} keeps its declared types', () => {{\n  const fn: typeof {name} = {name};\n  expect(fn).toBeDefined();\n}});"
        ),
        expected: "compiles",
        priority: 7,
        data: None,
    }
}

/// One test per pair where a function's body calls another known function.
fn integration_tests(framework: Framework, code: &str, functions: &[FunctionInfo]) -> Vec<Draft> {
    let lines: Vec<&str> = code.lines().collect();
    let mut drafts = Vec::new();

    for caller in functions.iter().filter(|f| f.kind == FunctionKind::Function) {
        let from = caller.start_line as usize;
        let to = (caller.end_line as usize).min(lines.len());
        let body = lines.get(from..to).unwrap_or(&[]).join("\n");

        for callee in functions
            .iter()
            .filter(|f| f.kind == FunctionKind::Function && f.name != caller.name)
        {
            if call_count(&body, &callee.name) == 0 {
                continue;
            }
            let call = format!("{}({})", caller.name, sample_args(caller));
            let code = match framework {
                Framework::Jest => format!(
                    "test('{a} works with {b}', () => {{\n  expect({call}).toBeDefined();\n}});",
                    a = caller.name,
                    b = callee.name
                ),
                Framework::Pytest => format!(
                    "def test_{a}_with_{b}():\n    assert {call} is not None",
                    a = caller.name,
                    b = callee.name
                ),
                _ => format!("// {call} exercises {}", callee.name),
            };
            drafts.push(Draft {
                name: format!("{} works with {}", caller.name, callee.name),
                description: format!("{} calls {}", caller.name, callee.name),
                kind: TestKind::Integration,
                code,
                expected: "pass",
                priority: 3,
                data: None,
            });
        }
    }

    drafts
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
