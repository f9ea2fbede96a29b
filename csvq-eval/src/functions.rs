use csvq_value::Primary;

use crate::error::{EvalError, EvalResult};

/// Dispatches a scalar function call by case-insensitive name. Returns
/// `Err` for an unknown name or a wrong argument count; both are semantic
/// errors raised at call time, not parse time.
pub fn call_scalar(name: &str, args: &[Primary]) -> EvalResult<Primary> {
    match name.to_ascii_uppercase().as_str() {
        "COALESCE" => Ok(args
            .iter()
            .find(|v| !v.is_null())
            .cloned()
            .unwrap_or(Primary::Null)),
        "IF" => {
            expect_arity(name, args, 3)?;
            if args[0].to_ternary().is_true() {
                Ok(args[1].clone())
            } else {
                Ok(args[2].clone())
            }
        }
        "IFNULL" => {
            expect_arity(name, args, 2)?;
            Ok(if args[0].is_null() {
                args[1].clone()
            } else {
                args[0].clone()
            })
        }
        "UPPER" => {
            expect_arity(name, args, 1)?;
            string_map(&args[0], str::to_uppercase)
        }
        "LOWER" => {
            expect_arity(name, args, 1)?;
            string_map(&args[0], str::to_lowercase)
        }
        "TRIM" => {
            expect_arity(name, args, 1)?;
            string_map(&args[0], |s| s.trim().to_string())
        }
        "LEN" | "LENGTH" => {
            expect_arity(name, args, 1)?;
            if args[0].is_null() {
                return Ok(Primary::Null);
            }
            let s = args[0].to_display_string();
            Ok(Primary::Integer(s.chars().count() as i64))
        }
        "SUBSTR" | "SUBSTRING" => {
            if args.len() != 2 && args.len() != 3 {
                return Err(arity_error(name));
            }
            if args.iter().any(Primary::is_null) {
                return Ok(Primary::Null);
            }
            let s = args[0].to_display_string();
            let start = args[1]
                .try_to_integer()
                .ok_or_else(|| EvalError::type_error(format!("{}: non-numeric start", name)))?;
            let chars: Vec<char> = s.chars().collect();
            let start_idx = (start - 1).max(0) as usize;
            let len = if args.len() == 3 {
                args[2]
                    .try_to_integer()
                    .ok_or_else(|| EvalError::type_error(format!("{}: non-numeric length", name)))?
                    .max(0) as usize
            } else {
                chars.len().saturating_sub(start_idx)
            };
            let end = (start_idx + len).min(chars.len());
            let slice = if start_idx < chars.len() {
                chars[start_idx..end].iter().collect()
            } else {
                String::new()
            };
            Ok(Primary::String(slice))
        }
        _ => Err(EvalError::semantic(format!("function {} does not exist", name))),
    }
}

fn string_map(value: &Primary, f: impl FnOnce(&str) -> String) -> EvalResult<Primary> {
    if value.is_null() {
        return Ok(Primary::Null);
    }
    Ok(Primary::String(f(&value.to_display_string())))
}

fn arity_error(name: &str) -> EvalError {
    EvalError::semantic(format!("function {} called with the wrong number of arguments", name))
}

fn expect_arity(name: &str, args: &[Primary], n: usize) -> EvalResult<()> {
    if args.len() != n {
        Err(arity_error(name))
    } else {
        Ok(())
    }
}

/// Names recognized as aggregate functions. Checked by the projection
/// stage to decide whether an `AggregateFunction` call reads from the
/// current group's source values or a built-in user declaration.
pub fn is_builtin_aggregate(name: &str) -> bool {
    matches!(
        name.to_ascii_uppercase().as_str(),
        "COUNT" | "SUM" | "AVG" | "MIN" | "MAX" | "MEDIAN" | "LISTAGG"
    )
}

/// Folds one group's column of non-NULL source values (already filtered
/// per SQL aggregate semantics, except `COUNT(*)` which folds every row)
/// into the aggregate's result.
pub fn call_aggregate(name: &str, values: &[Primary]) -> EvalResult<Primary> {
    match name.to_ascii_uppercase().as_str() {
        "COUNT" => Ok(Primary::Integer(values.len() as i64)),
        "SUM" => {
            if values.is_empty() {
                return Ok(Primary::Null);
            }
            sum(values)
        }
        "AVG" => {
            if values.is_empty() {
                return Ok(Primary::Null);
            }
            let total = match sum(values)? {
                Primary::Integer(n) => n as f64,
                Primary::Float(f) => f,
                _ => return Err(EvalError::type_error("AVG requires numeric input")),
            };
            Ok(Primary::Float(total / values.len() as f64))
        }
        "MIN" => fold_by_order(values, std::cmp::Ordering::Less),
        "MAX" => fold_by_order(values, std::cmp::Ordering::Greater),
        "MEDIAN" => median(values),
        "LISTAGG" => Ok(Primary::String(
            values
                .iter()
                .map(Primary::to_display_string)
                .collect::<Vec<_>>()
                .join(","),
        )),
        _ => Err(EvalError::semantic(format!("function {} does not exist", name))),
    }
}

fn sum(values: &[Primary]) -> EvalResult<Primary> {
    let mut all_integer = true;
    let mut total = 0.0_f64;
    for v in values {
        match v {
            Primary::Integer(n) => total += *n as f64,
            Primary::Float(f) => {
                all_integer = false;
                total += f;
            }
            other => {
                let f = other
                    .try_to_float()
                    .ok_or_else(|| EvalError::type_error("SUM requires numeric input"))?;
                all_integer = false;
                total += f;
            }
        }
    }
    if all_integer {
        Ok(Primary::Integer(total as i64))
    } else {
        Ok(Primary::Float(total))
    }
}

fn fold_by_order(values: &[Primary], keep: std::cmp::Ordering) -> EvalResult<Primary> {
    let mut best: Option<&Primary> = None;
    for v in values {
        best = match best {
            None => Some(v),
            Some(b) => match csvq_value::compare(v, b) {
                csvq_value::CompareResult::Less if keep == std::cmp::Ordering::Less => Some(v),
                csvq_value::CompareResult::Greater if keep == std::cmp::Ordering::Greater => Some(v),
                _ => Some(b),
            },
        };
    }
    Ok(best.cloned().unwrap_or(Primary::Null))
}

fn median(values: &[Primary]) -> EvalResult<Primary> {
    if values.is_empty() {
        return Ok(Primary::Null);
    }
    let mut floats: Vec<f64> = values
        .iter()
        .map(|v| {
            v.try_to_float()
                .ok_or_else(|| EvalError::type_error("MEDIAN requires numeric input"))
        })
        .collect::<EvalResult<_>>()?;
    floats.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = floats.len() / 2;
    let value = if floats.len() % 2 == 0 {
        (floats[mid - 1] + floats[mid]) / 2.0
    } else {
        floats[mid]
    };
    Ok(Primary::Float(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_star_counts_rows_including_null() {
        let values = vec![Primary::Integer(1), Primary::Integer(2), Primary::Null];
        assert_eq!(call_aggregate("COUNT", &values).unwrap(), Primary::Integer(3));
    }

    #[test]
    fn aggregation_with_null_matches_scenario() {
        let non_null = vec![Primary::Integer(1), Primary::Integer(2)];
        assert_eq!(call_aggregate("COUNT", &non_null).unwrap(), Primary::Integer(2));
        assert_eq!(call_aggregate("SUM", &non_null).unwrap(), Primary::Integer(3));
        assert_eq!(call_aggregate("AVG", &non_null).unwrap(), Primary::Float(1.5));
    }

    #[test]
    fn coalesce_returns_first_non_null() {
        let args = vec![Primary::Null, Primary::Null, Primary::Integer(7)];
        assert_eq!(call_scalar("COALESCE", &args).unwrap(), Primary::Integer(7));
    }

    #[test]
    fn unknown_function_is_a_semantic_error() {
        assert!(call_scalar("NOT_A_FUNCTION", &[]).is_err());
    }

    #[test]
    fn substr_extracts_one_based_range() {
        let args = vec![Primary::String("hello".to_string()), Primary::Integer(2), Primary::Integer(3)];
        assert_eq!(
            call_scalar("SUBSTR", &args).unwrap(),
            Primary::String("ell".to_string())
        );
    }
}
