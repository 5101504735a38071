use classc::{
    codegen::ClassType,
    err::{CompileError, ErrorKind},
    parse::{
        ast::{CallTarget, Expr, MethodId, Stmt},
        parse,
    },
    print::to_source,
    vm::{BufferConsole, Value, Vm, VmError},
    Compiler, Options,
};

use std::sync::Once;

/// Setup function that is only run once, even if called multiple times.
fn setup() {
    static INIT: Once = Once::new();
    INIT.call_once(|| env_logger::init());
}

fn compile(src: &str) -> ClassType {
    setup();
    Compiler::default().compile(src).unwrap()
}

fn compile_err(src: &str) -> CompileError {
    setup();
    Compiler::default().compile(src).unwrap_err()
}

fn try_call(src: &str, method: &str, args: Vec<Value>) -> Result<Value, VmError> {
    let class = compile(src);
    let mut vm = Vm::new(&class, BufferConsole::new());
    let mut this = vm.instantiate()?;
    vm.invoke(&mut this, method, args)
}

fn call(src: &str, method: &str, args: Vec<Value>) -> Value {
    try_call(src, method, args).unwrap()
}

/// Runs `Main` with the given input lines, returning its result and output.
fn run_main(src: &str, input: &[&str]) -> (Value, String) {
    let class = compile(src);
    let mut vm = Vm::new(&class, BufferConsole::with_input(input));
    let mut this = vm.instantiate().unwrap();
    let result = vm.invoke(&mut this, "Main", vec![]).unwrap();
    (result, vm.into_console().output)
}

#[test]
fn field_plus_parameter() {
    let src = r#"
        class Foo {
            int x = 5;
            int Add(int y) {
                return x + y;
            }
        }
    "#;
    assert_eq!(call(src, "Add", vec![Value::Int(3)]), Value::Int(8));
}

#[test]
fn string_plus_int_is_rejected() {
    let err = compile_err(
        r#"
        class A {
            string S() {
                return "1" + 2;
            }
        }
    "#,
    );
    assert!(matches!(err, CompileError::TypeMismatch { .. }), "{:?}", err);
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn while_with_false_condition_never_runs() {
    let src = r#"
        class A {
            int Count() {
                int n = 0;
                int i = 0;
                while (i < 0) {
                    i = i + 1;
                    n = n + 1;
                }
                return n;
            }
        }
    "#;
    assert_eq!(call(src, "Count", vec![]), Value::Int(0));
}

#[test]
fn greater_than_branches() {
    let src = r#"
        class A {
            int Pick(int a, int b) {
                if (a > b) {
                    return 1;
                } else {
                    return 2;
                }
            }
        }
    "#;
    let pick = |a, b| call(src, "Pick", vec![Value::Int(a), Value::Int(b)]);
    assert_eq!(pick(3, 5), Value::Int(2));
    assert_eq!(pick(5, 3), Value::Int(1));
    assert_eq!(pick(5, 5), Value::Int(2));
}

#[test]
fn forward_reference_is_resolved() {
    let src = r#"
        class A {
            int First() {
                return Second();
            }
            int Second() {
                return 2;
            }
        }
    "#;
    let object = parse(src).unwrap();
    match &object.methods[0].body[0] {
        Stmt::Return(Some(Expr::Call(c))) => {
            assert_eq!(c.target, CallTarget::Method(MethodId(1)));
        }
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(call(src, "First", vec![]), Value::Int(2));
}

#[test]
fn random_with_equal_bounds() {
    let src = r#"
        class A {
            int R() {
                return RandomInt(1, 1);
            }
            int Small() {
                return RandomInt(3);
            }
        }
    "#;
    let class = compile(src);
    let mut vm = Vm::new(&class, BufferConsole::new());
    let mut this = vm.instantiate().unwrap();
    for _ in 0..20 {
        assert_eq!(vm.invoke(&mut this, "R", vec![]), Ok(Value::Int(1)));
        match vm.invoke(&mut this, "Small", vec![]) {
            Ok(Value::Int(n)) => assert!((0..3).contains(&n)),
            other => panic!("unexpected {:?}", other),
        }
    }
}

#[test]
fn operator_precedence() {
    let src = r#"
        class Calc {
            int A() { return 2 + 3 * 4; }
            int B() { return 10 - 4 - 3; }
            int C() { return 20 / 2 / 5; }
            int D() { return 17 % 5 * 2; }
            int E() { return 1 + 2 * 3 - 4 / 2; }
        }
    "#;
    assert_eq!(call(src, "A", vec![]), Value::Int(14));
    assert_eq!(call(src, "B", vec![]), Value::Int(3));
    assert_eq!(call(src, "C", vec![]), Value::Int(2));
    assert_eq!(call(src, "D", vec![]), Value::Int(4));
    assert_eq!(call(src, "E", vec![]), Value::Int(5));
}

#[test]
fn logical_operators() {
    let src = r#"
        class A {
            bool B(bool a, bool b) {
                return a & b | a ^ b;
            }
            int Mask() {
                int a = 6;
                return a & 3;
            }
        }
    "#;
    let b = |x, y| call(src, "B", vec![Value::Bool(x), Value::Bool(y)]);
    assert_eq!(b(true, false), Value::Bool(true));
    assert_eq!(b(true, true), Value::Bool(false));
    assert_eq!(b(false, false), Value::Bool(false));
    assert_eq!(call(src, "Mask", vec![]), Value::Int(2));
}

#[test]
fn predicates_as_values() {
    let src = r#"
        class A {
            bool Same(int a, int b) {
                bool same = a == b;
                return same;
            }
            bool Differ(int a, int b) {
                return a != b;
            }
            bool AtMost(int a, int b) {
                return a <= b;
            }
        }
    "#;
    let args = |a, b| vec![Value::Int(a), Value::Int(b)];
    assert_eq!(call(src, "Same", args(2, 2)), Value::Bool(true));
    assert_eq!(call(src, "Same", args(2, 3)), Value::Bool(false));
    assert_eq!(call(src, "Differ", args(2, 3)), Value::Bool(true));
    assert_eq!(call(src, "AtMost", args(3, 3)), Value::Bool(true));
    assert_eq!(call(src, "AtMost", args(4, 3)), Value::Bool(false));
}

#[test]
fn increments_and_compound_assignment() {
    let src = r#"
        class A {
            int M() {
                int i = 5;
                i++;
                i++;
                i--;
                i += 10;
                i -= 2;
                i *= 3;
                return i;
            }
        }
    "#;
    assert_eq!(call(src, "M", vec![]), Value::Int(42));
}

#[test]
fn string_concatenation() {
    let src = r#"
        class A {
            string Greet(string name) {
                return "Hello, " + name;
            }
        }
    "#;
    assert_eq!(
        call(src, "Greet", vec![Value::Str("World".into())]),
        Value::Str("Hello, World".into())
    );
}

#[test]
fn console_output() {
    let src = r#"
        class A {
            object o = 5;
            void Main() {
                Print("a");
                Print(1);
                PrintLine();
                PrintLine(true);
                PrintLine(2.5);
                PrintLine(o);
            }
        }
    "#;
    let (result, output) = run_main(src, &[]);
    assert_eq!(result, Value::Void);
    assert_eq!(output, "a1\nTrue\n2.5\n5\n");
}

#[test]
fn console_input() {
    let src = r#"
        class A {
            int Main() {
                int a = ReadInt();
                int b = ReadInt();
                string s = ReadLine();
                PrintLine(s + "!");
                return a * b;
            }
        }
    "#;
    let (result, output) = run_main(src, &["6", " 7 ", "done"]);
    assert_eq!(result, Value::Int(42));
    assert_eq!(output, "done!\n");
}

#[test]
fn read_int_rejects_bad_input() {
    let src = r#"
        class A {
            int Main() {
                return ReadInt();
            }
        }
    "#;
    let class = compile(src);
    let mut vm = Vm::new(&class, BufferConsole::with_input(&["seven"]));
    let mut this = vm.instantiate().unwrap();
    assert_eq!(
        vm.invoke(&mut this, "Main", vec![]),
        Err(VmError::Format("seven".into()))
    );
}

#[test]
fn recursion() {
    let src = r#"
        class Math {
            int Fact(int n) {
                if (n <= 1) {
                    return 1;
                }
                return n * Fact(n - 1);
            }
        }
    "#;
    assert_eq!(call(src, "Fact", vec![Value::Int(5)]), Value::Int(120));
}

#[test]
fn runaway_recursion_is_caught() {
    let src = r#"
        class A {
            int Loop(int n) {
                return Loop(n + 1);
            }
        }
    "#;
    assert!(matches!(
        try_call(src, "Loop", vec![Value::Int(0)]),
        Err(VmError::StackOverflow(_))
    ));
}

#[test]
fn block_locals_shadow_outer_ones() {
    let src = r#"
        class A {
            int M() {
                int x = 1;
                int total = 0;
                if (true) {
                    int x = 5;
                    total = x;
                }
                return total + x;
            }
        }
    "#;
    assert_eq!(call(src, "M", vec![]), Value::Int(6));
}

#[test]
fn else_if_chain() {
    let src = r#"
        class A {
            string Grade(int s) {
                if (s > 89) {
                    return "A";
                } else if (s > 79) {
                    return "B";
                } else {
                    return "C";
                }
            }
        }
    "#;
    let grade = |s| call(src, "Grade", vec![Value::Int(s)]);
    assert_eq!(grade(95), Value::Str("A".into()));
    assert_eq!(grade(85), Value::Str("B".into()));
    assert_eq!(grade(10), Value::Str("C".into()));
}

#[test]
fn fields_keep_state_between_calls() {
    let src = r#"
        class Counter {
            int count = 0;
            void Bump() {
                count++;
            }
            int Get() {
                return count;
            }
        }
    "#;
    let class = compile(src);
    let mut vm = Vm::new(&class, BufferConsole::new());
    let mut this = vm.instantiate().unwrap();
    vm.invoke(&mut this, "Bump", vec![]).unwrap();
    vm.invoke(&mut this, "Bump", vec![]).unwrap();
    assert_eq!(vm.invoke(&mut this, "Get", vec![]), Ok(Value::Int(2)));
}

#[test]
fn field_initializer_calls_later_method() {
    let src = r#"
        class A {
            int x = Five();
            int Five() {
                return 5;
            }
            int Get() {
                return x;
            }
        }
    "#;
    assert_eq!(call(src, "Get", vec![]), Value::Int(5));
}

#[test]
fn typed_literals() {
    let src = r#"
        class A {
            long Big() {
                long a = 3000000000;
                return a + 1;
            }
            char Letter() {
                char c = q;
                return c;
            }
            byte Wrap() {
                byte b = 250;
                return b + 10;
            }
        }
    "#;
    assert_eq!(call(src, "Big", vec![]), Value::Long(3_000_000_001));
    assert_eq!(call(src, "Letter", vec![]), Value::Char('q'));
    assert_eq!(call(src, "Wrap", vec![]), Value::Byte(4));
}

#[test]
fn integer_division_by_zero() {
    let src = r#"
        class A {
            int Div(int a) {
                return 10 / a;
            }
        }
    "#;
    assert_eq!(
        try_call(src, "Div", vec![Value::Int(0)]),
        Err(VmError::DivideByZero)
    );
}

#[test]
fn syntax_errors() {
    let err = compile_err("class A { void M() { int x = 1 } }");
    assert_eq!(err.kind(), ErrorKind::Syntax);

    let err = compile_err("class A { int x = 1 # 2; }");
    assert_eq!(err.kind(), ErrorKind::Syntax);

    let err = compile_err("class A { void M() { x == 1; } }");
    assert_eq!(err.kind(), ErrorKind::Syntax);
}

#[test]
fn binding_errors() {
    let err = compile_err("class A { int M() { return y; } }");
    assert!(matches!(err, CompileError::UnknownIdentifier { .. }), "{:?}", err);

    let err = compile_err("class A { void M() { Missing(); } }");
    assert!(matches!(err, CompileError::UnresolvedMethod { .. }), "{:?}", err);

    let err = compile_err("class A { int One(int a) { return a; } void M() { One(1, 2); } }");
    assert!(matches!(err, CompileError::ArityMismatch { found: 2, .. }), "{:?}", err);

    let err = compile_err("class A { void M() { PrintLine(1, 2); } }");
    assert!(matches!(err, CompileError::ArityMismatch { .. }), "{:?}", err);

    let err = compile_err("class A { int x = 1; int x = 2; }");
    assert!(matches!(err, CompileError::Duplicate { what: "field", .. }), "{:?}", err);

    let err = compile_err("class A { void M() { } void M() { } }");
    assert!(matches!(err, CompileError::Duplicate { what: "method", .. }), "{:?}", err);

    let err = compile_err("class A { void M() { int a = 1; int a = 2; } }");
    assert!(matches!(err, CompileError::Duplicate { what: "local", .. }), "{:?}", err);

    let err = compile_err("class A { void Print(int x) { } }");
    assert!(matches!(err, CompileError::Reserved { .. }), "{:?}", err);

    let err = compile_err("class A { void M() { Other.M(); } }");
    assert_eq!(err.kind(), ErrorKind::Binding);
}

#[test]
fn type_errors() {
    let err = compile_err("class A { byte b = 300; }");
    assert!(matches!(err, CompileError::InvalidLiteral { .. }), "{:?}", err);

    let err = compile_err("class A { string s = x; void M() { s++; } }");
    assert!(matches!(err, CompileError::NonNumericIncrement { .. }), "{:?}", err);

    let err = compile_err(r#"class A { string M() { return "a" * "b"; } }"#);
    assert!(
        matches!(err, CompileError::UnsupportedOperator { op: "*", .. }),
        "{:?}",
        err
    );

    let err = compile_err("class A { int M(int a) { if (a > 1) { return 1; } } }");
    assert!(matches!(err, CompileError::MissingReturn { .. }), "{:?}", err);

    let err = compile_err("class A { void M() { void v = 1; } }");
    assert!(matches!(err, CompileError::VoidNotAllowed { .. }), "{:?}", err);

    let err = compile_err("class A { void M() { return 1; } }");
    assert!(matches!(err, CompileError::UnexpectedReturnValue { .. }), "{:?}", err);

    let err = compile_err("class A { void V() { } void M() { Print(V()); } }");
    assert!(matches!(err, CompileError::VoidNotAllowed { .. }), "{:?}", err);

    let err = compile_err(
        "class A { int Half(int a) { return a; } void M() { bool b = true; Half(b); } }",
    );
    assert!(matches!(err, CompileError::TypeMismatch { .. }), "{:?}", err);
}

#[test]
fn printed_source_is_canonical() {
    let src = "class A { int x = 5; int Add(int y) { return x + y; } }";
    assert_eq!(
        to_source(&parse(src).unwrap()),
        "class A {\n    int x = 5;\n    int Add(int y) {\n        return x + y;\n    }\n}\n"
    );
}

#[test]
fn printed_source_round_trips() {
    let src = r#"
        class Shapes {
            int sides = 4;
            string label = "square box";
            double scale = 1.5;
            int Area(int w, int h) {
                int a = w * h + 2 - 1;
                if (a > 10 & w != h) {
                    PrintLine("big");
                } else if (a == 0) {
                    return 0;
                } else {
                    a++;
                }
                while (a < 100) {
                    a = a * 2;
                }
                a *= 3 + 4;
                a -= w - h;
                bool big = a > 10;
                big &= w != h | h > 2;
                return a;
            }
        }
    "#;
    let parsed = parse(src).unwrap();
    let first = to_source(&parsed);
    let reparsed = parse(&first).unwrap();
    assert_eq!(reparsed, parsed);
    assert_eq!(to_source(&reparsed), first);
    assert!(first.contains("    string label = \"square box\";\n"));
    assert!(first.contains("        } else if (a == 0) {\n"));
    assert!(first.contains("        a = a * (3 + 4);\n"));
    assert!(first.contains("        a = a - (w - h);\n"));
    assert!(first.contains("        big = big & (w != h | h > 2);\n"));
    compile(&first);
}

#[test]
fn compound_assignment_survives_printing() {
    let src = "class A { int M() { int x = 2; x *= 3 + 4; return x; } }";
    assert_eq!(call(src, "M", vec![]), Value::Int(14));

    let printed = to_source(&parse(src).unwrap());
    assert_eq!(call(&printed, "M", vec![]), Value::Int(14));
}

#[test]
fn parentheses_group_values() {
    let src = r#"
        class A {
            int M(int a) {
                return (a + 1) * (a - 1);
            }
            bool Same(int a, int b) {
                return (a > 0) == (b > 0);
            }
        }
    "#;
    assert_eq!(call(src, "M", vec![Value::Int(5)]), Value::Int(24));
    assert_eq!(
        call(src, "Same", vec![Value::Int(3), Value::Int(-2)]),
        Value::Bool(false)
    );
}

#[test]
fn deeply_nested_calls() {
    let depth = 30;
    let src = format!(
        "class A {{ int Id(int v) {{ return v; }} int M() {{ return {}1{}; }} }}",
        "Id(".repeat(depth),
        ")".repeat(depth)
    );
    assert_eq!(call(&src, "M", vec![]), Value::Int(1));
}

#[test]
fn string_arguments_hide_operators() {
    let src = r#"
        class A {
            string Echo(string s) {
                return s;
            }
            string M() {
                return Echo("a & b // (c") + Echo("== d");
            }
        }
    "#;
    assert_eq!(
        call(src, "M", vec![]),
        Value::Str("a & b // (c== d".into())
    );
}

#[test]
fn fields_start_at_their_type_default() {
    let src = r#"
        class A {
            int x = Get();
            int y = 2;
            int Get() {
                return y + 1;
            }
            int X() {
                return x;
            }
        }
    "#;
    assert_eq!(call(src, "X", vec![]), Value::Int(1));
}

#[test]
fn listing_shows_constructor() {
    let class = compile("class A { int x = 5; }");
    let listing = class.to_string();
    assert!(listing.starts_with(".class A\n"));
    assert!(listing.contains("    IL_0000: ldarg.0\n"));
    assert!(listing.contains("call object::.ctor"));
    assert!(listing.contains("stfld #0"));
}

#[test]
fn run_without_entry_is_ok() {
    setup();
    let mut c = Compiler::new(Options {
        entry: "Nope".into(),
        ..Options::default()
    });
    c.run("class A { int x = 1; }".into()).unwrap();
    c.run("class A { int x = ; }".into()).unwrap_err();
}
