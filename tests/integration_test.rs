// Integration tests for the C++ subset interpreter

use cppstep::interpreter::{Interpreter, RunOutcome, RuntimeError};
use cppstep::parser::parse_source;
use cppstep::runtime::config::{BufferedConsole, Config};
use cppstep::runtime::Runtime;
use pretty_assertions::assert_eq;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

fn interpreter(source: &str, config: Config) -> Interpreter {
    let program = parse_source(source).expect("Parsing failed");
    Interpreter::new(program, source, Runtime::new(config))
}

/// Run to completion and return main's exit status
fn run(source: &str) -> i32 {
    match interpreter(source, Config::default()).run(&|| false) {
        Ok(RunOutcome::Finished(code)) => code,
        other => panic!("Execution did not finish: {:?}", other),
    }
}

fn fault(source: &str) -> RuntimeError {
    interpreter(source, Config::default())
        .run(&|| false)
        .expect_err("Execution should fault")
}

/// Run with a buffered console and return the exit status and output
fn run_with_output(source: &str) -> (i32, String) {
    let console = Rc::new(BufferedConsole::new());
    let mut it = interpreter(source, Config::default().with_console(console.clone()));
    match it.run(&|| false) {
        Ok(RunOutcome::Finished(code)) => (code, console.output()),
        other => panic!("Execution did not finish: {:?}", other),
    }
}

#[test]
fn test_simple_arithmetic() {
    let source = r#"
        int main() {
            int x = 5;
            int y = 10;
            int z = x + y;
            return z;
        }
    "#;
    assert_eq!(run(source), 15);
}

#[test]
fn test_postfix_increment_in_expression() {
    let source = r#"
        int main() {
            int a = 5;
            int b = a++ + 2;
            return a * 10 + b;
        }
    "#;
    assert_eq!(run(source), 67);
}

#[test]
fn test_integral_division_floors() {
    let source = r#"
        int main() {
            int q = -7 / 2;
            return q;
        }
    "#;
    assert_eq!(run(source), -4);
}

#[test]
fn test_function_call_and_recursion() {
    let source = r#"
        int add(int a, int b) {
            return a + b;
        }

        int fact(int n) {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }

        int main() {
            return add(3, 4) + fact(5);
        }
    "#;
    assert_eq!(run(source), 127);
}

#[test]
fn test_prototype_before_definition() {
    let source = r#"
        int twice(int x);

        int main() {
            return twice(21);
        }

        int twice(int x) {
            return x * 2;
        }
    "#;
    assert_eq!(run(source), 42);
}

#[test]
fn test_default_arguments() {
    let source = r#"
        int add(int a, int b = 5) {
            return a + b;
        }

        int main() {
            return add(1) * 10 + add(1, 1);
        }
    "#;
    assert_eq!(run(source), 62);
}

#[test]
fn test_overload_resolution_prefers_fewest_casts() {
    let source = r#"
        int f(int x) { return 1; }
        int f(double x) { return 2; }

        int main() {
            return f(1) * 100 + f(1.5) * 10 + f('a');
        }
    "#;
    assert_eq!(run(source), 121);
}

#[test]
fn test_ambiguous_overload_faults() {
    let source = r#"
        void g(int x) {}
        void g(long x) {}

        int main() {
            g(1.5);
            return 0;
        }
    "#;
    let err = fault(source);
    assert!(
        err.message
            .starts_with("Call of overloaded function 'g' matches more than one candidate"),
        "unexpected message: {}",
        err.message
    );
}

#[test]
fn test_reference_parameter_aliases_argument() {
    let source = r#"
        void bump(int &x) {
            x++;
        }

        int main() {
            int a = 1;
            bump(a);
            bump(a);
            return a;
        }
    "#;
    assert_eq!(run(source), 3);
}

#[test]
fn test_callee_cannot_see_caller_locals() {
    let source = r#"
        int peek() {
            return secret;
        }

        int main() {
            int secret = 1;
            return peek();
        }
    "#;
    assert_eq!(fault(source).message, "undefined identifier secret");
}

#[test]
fn test_missing_main() {
    assert_eq!(fault("int x = 1;").message, "undefined identifier main");
}

#[test]
fn test_pointers() {
    let source = r#"
        int main() {
            int x = 3;
            int *p = &x;
            *p = 9;
            int a[3] = {1, 2, 3};
            int *q = a;
            q++;
            return x * 100 + *q * 10 + q[1];
        }
    "#;
    assert_eq!(run(source), 923);
}

#[test]
fn test_function_pointer() {
    let source = r#"
        int twice(int x) { return 2 * x; }

        int main() {
            int (*fp)(int) = &twice;
            return fp(4);
        }
    "#;
    assert_eq!(run(source), 8);
}

#[test]
fn test_array_partial_initializer_fills_defaults() {
    let source = r#"
        int main() {
            int arr[3] = {-1};
            return arr[0] * 100 + arr[1] * 10 + arr[2];
        }
    "#;
    assert_eq!(run(source), -100);
}

#[test]
fn test_ragged_initializer_faults() {
    let source = r#"
        int main() {
            int arr[2][3] = {{1, 2, 3}, {4, 5}};
            return 0;
        }
    "#;
    assert_eq!(fault(source).message, "dimensions do not agree, 3 != 2");
}

#[test]
fn test_unsized_array_takes_initializer_length() {
    let source = r#"
        int main() {
            int a[] = {4, 5, 6, 7};
            char s[] = "hey";
            return sizeof(a) / sizeof(int) * 10 + sizeof(s);
        }
    "#;
    assert_eq!(run(source), 44);
}

#[test]
fn test_struct_members_and_methods() {
    let source = r#"
        struct Point {
            int x;
            int y = 7;
            int sum() {
                return x + y;
            }
        };

        int main() {
            Point p = {2};
            int before = p.sum();
            p.x = 10;
            Point *pp = &p;
            pp->y = 1;
            return before * 100 + p.sum();
        }
    "#;
    assert_eq!(run(source), 911);
}

#[test]
fn test_struct_copy_is_deep() {
    let source = r#"
        struct Pair {
            int a;
            int b;
        };

        int main() {
            Pair p = {1, 2};
            Pair q = p;
            q.a = 5;
            return p.a * 10 + q.a;
        }
    "#;
    assert_eq!(run(source), 15);
}

#[test]
fn test_switch_fallthrough_and_break() {
    let source = r#"
        int pick(int v) {
            int r = 0;
            switch (v) {
                case 1:
                    r = 1;
                    break;
                case 2:
                    r = 2;
                case 3:
                    r += 10;
                    break;
                default:
                    r = 99;
            }
            return r;
        }

        int main() {
            return pick(2) * 1000 + pick(1) * 100 + pick(5);
        }
    "#;
    assert_eq!(run(source), 12199);
}

#[test]
fn test_loops_with_break_and_continue() {
    let source = r#"
        int main() {
            int total = 0;
            for (int i = 0; i < 10; i++) {
                if (i % 2 == 0) continue;
                if (i > 7) break;
                total += i;
            }
            int n = 0;
            while (n < 5) n++;
            do {
                n--;
            } while (n > 3);
            return total * 10 + n;
        }
    "#;
    assert_eq!(run(source), 163);
}

#[test]
fn test_range_for_by_value_and_reference() {
    let source = r#"
        int main() {
            int a[4] = {1, 2, 3, 4};
            int s = 0;
            for (int v : a) s += v;
            for (int &v : a) v *= 2;
            for (auto v : a) s += v;
            return s;
        }
    "#;
    assert_eq!(run(source), 30);
}

#[test]
fn test_typedef_and_const() {
    let source = r#"
        typedef int number;

        int main() {
            const number c = 4;
            number d = c + 1;
            return d;
        }
    "#;
    assert_eq!(run(source), 5);
}

#[test]
fn test_assignment_to_const_faults() {
    let source = r#"
        int main() {
            const int c = 1;
            c = 2;
            return c;
        }
    "#;
    assert!(fault(source).message.starts_with("assignment of read-only variable"));
}

#[test]
fn test_fault_carries_line() {
    let source = "int main() {\n  int a = 1;\n  return a / 0;\n}\n";
    let err = fault(source);
    assert_eq!(err.message, "division by zero");
    assert_eq!(err.line(), Some(3));
}

#[test]
fn test_printf_to_console() {
    let source = r#"
        #include <cstdio>

        int main() {
            printf("%d-%s|%5.2f\n", 42, "ok", 3.14159);
            std::puts("done");
            return 0;
        }
    "#;
    let (code, output) = run_with_output(source);
    assert_eq!(code, 0);
    assert_eq!(output, "42-ok| 3.14\ndone\n");
}

#[test]
fn test_getchar_waits_for_input() {
    let source = r#"
        #include <cstdio>

        int main() {
            int c = getchar();
            return c;
        }
    "#;
    let console = Rc::new(BufferedConsole::new());
    let mut it = interpreter(source, Config::default().with_console(console.clone()));
    assert_eq!(it.run(&|| false).unwrap(), RunOutcome::AwaitingInput);
    assert_eq!(it.run(&|| false).unwrap(), RunOutcome::AwaitingInput);
    console.feed("A");
    assert_eq!(it.run(&|| false).unwrap(), RunOutcome::Finished(65));
}

#[test]
fn test_getchar_end_of_input() {
    let source = r#"
        #include <stdio.h>

        int main() {
            return getchar();
        }
    "#;
    let console = Rc::new(BufferedConsole::new());
    console.close_input();
    let mut it = interpreter(source, Config::default().with_console(console));
    assert_eq!(it.run(&|| false).unwrap(), RunOutcome::Finished(-1));
}

#[test]
fn test_timeout_measured_across_idle_ticks() {
    let source = "int main() { while (1) {} }";
    let config = Config::default()
        .with_timeout(Some(Duration::from_millis(50)))
        .with_quanta_per_tick(10);
    let mut it = interpreter(source, config);
    let mut outcome = RunOutcome::Paused;
    for _ in 0..200 {
        outcome = it.run_tick(&|| false).unwrap();
        if outcome != RunOutcome::Paused {
            break;
        }
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(outcome, RunOutcome::TimedOut);
}
