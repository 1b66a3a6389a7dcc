//! Checks a modifier's output against its kind's return contract.

use tb_core::errors::{ErrorInfo, TbError};
use tb_core::{DynArray, ElementType};

use crate::quantity::ModifierKind;

/// What the validator needs to know about the invocation.
#[derive(Debug, Clone, Copy)]
pub struct ReturnContract<'a> {
    /// Kind of the modifier that produced the output.
    pub kind: ModifierKind,
    /// Display name of the modifier, for diagnostics.
    pub name: &'a str,
    /// Whether complex output is acceptable for this invocation.
    pub complex_capable: bool,
    /// Whether NaN and INF values are rejected.
    pub check_finite: bool,
}

impl ReturnContract<'_> {
    fn info(&self, code: &str, message: String) -> ErrorInfo {
        ErrorInfo::new(code, message)
            .with_context("kind", self.kind)
            .with_context("modifier", self.name)
    }

    fn prefix(&self) -> String {
        format!("{} modifier '{}'", self.kind, self.name)
    }
}

/// Validates `returned` against the inputs it replaces.
///
/// Order of checks: count, then per array shape, element type, complexity
/// and finiteness (when enabled). The first violation wins.
pub fn validate_return(
    contract: &ReturnContract<'_>,
    inputs: &[&DynArray],
    returned: &[DynArray],
) -> Result<(), TbError> {
    let expected = contract.kind.num_returns();
    if returned.len() != expected {
        return Err(TbError::ReturnCount(
            contract
                .info(
                    "modifier.return-count",
                    format!(
                        "{} expected to return {expected} array(s), but got {}",
                        contract.prefix(),
                        returned.len()
                    ),
                )
                .with_context("expected", expected)
                .with_context("actual", returned.len()),
        ));
    }

    for (input, output) in inputs.iter().zip(returned) {
        if input.shape() != output.shape() {
            return Err(TbError::ReturnShape(
                contract
                    .info(
                        "modifier.return-shape",
                        format!("{} must return the same shape as its input", contract.prefix()),
                    )
                    .with_context("expected", format!("{:?}", input.shape()))
                    .with_context("actual", format!("{:?}", output.shape())),
            ));
        }
        check_element_type(contract, output)?;
        if output.is_complex() && !contract.complex_capable {
            return Err(TbError::Complexity(
                contract
                    .info(
                        "modifier.complex",
                        format!("{} must not return complex values", contract.prefix()),
                    )
                    .with_hint("declare the modifier complex-capable"),
            ));
        }
        if contract.check_finite && !output.all_finite() {
            return Err(TbError::NonFinite(contract.info(
                "modifier.non-finite",
                format!("{} returned NaN or INF values", contract.prefix()),
            )));
        }
    }
    Ok(())
}

fn check_element_type(contract: &ReturnContract<'_>, output: &DynArray) -> Result<(), TbError> {
    let actual = output.element_type();
    let ok = match contract.kind {
        ModifierKind::SiteState => actual == ElementType::Bool,
        _ => matches!(actual, ElementType::Numeric(_)),
    };
    if ok {
        return Ok(());
    }
    let wanted = match contract.kind {
        ModifierKind::SiteState => "a boolean array",
        _ => "a numeric array",
    };
    Err(TbError::ReturnType(
        contract
            .info(
                "modifier.return-type",
                format!("{} must return {wanted}", contract.prefix()),
            )
            .with_context("actual", actual),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use num_complex::Complex64;

    fn contract(kind: ModifierKind, complex_capable: bool) -> ReturnContract<'static> {
        ReturnContract {
            kind,
            name: "mod()",
            complex_capable,
            check_finite: true,
        }
    }

    #[test]
    fn count_mismatch_names_both_counts() {
        let x = DynArray::F32(array![0.0]);
        let err = validate_return(
            &contract(ModifierKind::SitePosition, false),
            &[&x, &x, &x],
            &[x.clone(), x.clone()],
        )
        .unwrap_err();
        assert!(err.info().message.contains("expected to return 3 array(s), but got 2"));
    }

    #[test]
    fn state_must_stay_boolean() {
        let state = DynArray::Bool(array![true]);
        let err = validate_return(
            &contract(ModifierKind::SiteState, false),
            &[&state],
            &[DynArray::F32(array![1.0])],
        )
        .unwrap_err();
        assert!(matches!(err, TbError::ReturnType(_)));
    }

    #[test]
    fn complex_output_needs_capability() {
        let energy = DynArray::F32(array![0.0]);
        let out = DynArray::C128(array![Complex64::new(1.0, 1.0)]);
        let denied = validate_return(
            &contract(ModifierKind::OnsiteEnergy, false),
            &[&energy],
            std::slice::from_ref(&out),
        );
        assert!(matches!(denied, Err(TbError::Complexity(_))));
        validate_return(
            &contract(ModifierKind::OnsiteEnergy, true),
            &[&energy],
            &[out],
        )
        .unwrap();
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let energy = DynArray::F64(array![0.0, 0.0]);
        let err = validate_return(
            &contract(ModifierKind::OnsiteEnergy, false),
            &[&energy],
            &[DynArray::F64(array![1.0, f64::INFINITY])],
        )
        .unwrap_err();
        assert!(err.info().message.contains("NaN or INF"));
    }

    #[test]
    fn finiteness_check_can_be_disabled() {
        let energy = DynArray::F64(array![-1.0, 4.0]);
        let lenient = ReturnContract {
            check_finite: false,
            ..contract(ModifierKind::OnsiteEnergy, false)
        };
        validate_return(&lenient, &[&energy], &[DynArray::F64(array![f64::NAN, 2.0])]).unwrap();

        let err = validate_return(&lenient, &[&energy], &[DynArray::F64(array![f64::NAN])])
            .unwrap_err();
        assert!(matches!(err, TbError::ReturnShape(_)));
    }
}
