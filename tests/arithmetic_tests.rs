use cppstep::interpreter::{Interpreter, RunOutcome};
use cppstep::parser::parse_source;
use cppstep::runtime::config::{Config, OverflowPolicy};
use cppstep::runtime::Runtime;

fn run_with(source: &str, policy: OverflowPolicy) -> Result<RunOutcome, String> {
    let program = parse_source(source).expect("Parsing failed");
    let config = Config::default().with_overflow(policy);
    let mut interpreter = Interpreter::new(program, source, Runtime::new(config));
    interpreter.run(&|| false).map_err(|e| e.message)
}

fn run(source: &str) -> i32 {
    match run_with(source, OverflowPolicy::Error) {
        Ok(RunOutcome::Finished(code)) => code,
        other => panic!("Execution did not finish: {:?}", other),
    }
}

#[test]
fn test_arithmetic_coercion() {
    let source = r#"
    int main() {
        char c = 'a';
        int sum = c + 10;
        int diff = 10 - c;
        double half = 7.0 / 2;
        double whole = 7 / 2;
        int truncated = (int)3.9;
        bool flag = 5;
        return sum * 0 + (sum == 107) + (diff == -87) * 2 + (int)(half * 10) * 4
            + (int)(whole * 10) * 1000 + truncated * 100000 + flag * 1000000;
    }
    "#;
    // 1 + 2 + 140 + 30000 + 300000 + 1000000
    assert_eq!(run(source), 1_330_143);
}

#[test]
fn test_pointer_arithmetic() {
    let source = r#"
    int main() {
        int arr[5];
        int *p = arr;
        int *p2 = p + 2;

        *p2 = 42;
        *(p + 4) = 7;
        return arr[2] + arr[4] + arr[0];
    }
    "#;
    assert_eq!(run(source), 49);
}

#[test]
fn test_compound_assignment_and_bitwise() {
    let source = r#"
    int main() {
        int x = 3;
        x += 5;
        x *= 2;
        x -= 1;
        int bits = (1 << 4) | 3;
        bits ^= 1;
        return x * 100 + (bits & 0xff);
    }
    "#;
    assert_eq!(run(source), 1518);
}

#[test]
fn test_signed_overflow_faults_by_default() {
    let source = r#"
    int main() {
        int x = 2147483647;
        x = x + 1;
        return 0;
    }
    "#;
    let err = run_with(source, OverflowPolicy::Error).unwrap_err();
    assert!(err.starts_with("overflow of int"), "unexpected message: {}", err);
}

#[test]
fn test_signed_overflow_wraps_when_configured() {
    let source = r#"
    int main() {
        int x = 2147483647;
        x = x + 1;
        return x < 0;
    }
    "#;
    assert_eq!(run_with(source, OverflowPolicy::Wrap), Ok(RunOutcome::Finished(1)));
}

#[test]
fn test_unsigned_wraps_below_zero() {
    let source = r#"
    int main() {
        unsigned int u = 0;
        u = u - 1;
        return u == 4294967295;
    }
    "#;
    assert_eq!(run_with(source, OverflowPolicy::Wrap), Ok(RunOutcome::Finished(1)));
    let err = run_with(source, OverflowPolicy::Error).unwrap_err();
    assert!(err.starts_with("overflow of"), "unexpected message: {}", err);
}

#[test]
fn test_division_by_zero() {
    let source = r#"
    int main() {
        int zero = 0;
        return 5 % zero;
    }
    "#;
    assert_eq!(run_with(source, OverflowPolicy::Error), Err("division by zero".to_string()));
}

fn fault(source: &str) -> String {
    run_with(source, OverflowPolicy::Error).unwrap_err()
}

#[test]
fn test_pointer_arithmetic_at_extreme_offsets_faults() {
    let add = r#"
    int main() {
        int a[2];
        int *p = a;
        p = p + 9223372036854775807LL;
        p = p + 1;
        return 0;
    }
    "#;
    assert_eq!(fault(add), "pointer arithmetic overflow");

    let increment = r#"
    int main() {
        int a[2];
        int *p = a;
        p = p + 9223372036854775807LL;
        p++;
        return 0;
    }
    "#;
    assert_eq!(fault(increment), "pointer arithmetic overflow");

    let unsigned_offset = r#"
    int main() {
        int a[2];
        int *p = a + 1;
        p = p + 18446744073709551615ULL;
        return 0;
    }
    "#;
    assert_eq!(fault(unsigned_offset), "pointer arithmetic overflow");
}

#[test]
fn test_oversized_array_bounds_fault() {
    let overflowing = r#"
    int main() {
        int a[170141183460469231731687303715884105727ULL * 2];
        return 0;
    }
    "#;
    assert_eq!(fault(overflowing), "array size is too large");

    let huge = r#"
    int main() {
        int a[100000000000000];
        return 0;
    }
    "#;
    assert_eq!(fault(huge), "array size is too large");
}

#[test]
fn test_remainder_truncates_in_constants_and_at_runtime() {
    let source = r#"
    int main() {
        int a[-7 % 4 + 5];
        int x = -7;
        int r = x % 4;
        return (sizeof(a) / sizeof(int)) * 10 + (r + 5);
    }
    "#;
    assert_eq!(run(source), 22);
}

#[test]
fn test_narrow_string_out_of_char_range_faults() {
    let source = r#"
    int main() {
        char s[] = "café";
        return 0;
    }
    "#;
    assert_eq!(
        fault(source),
        "character '\u{e9}' in string literal is out of range of char"
    );
}
