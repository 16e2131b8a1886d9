//! Client-side SASL mechanism choice.

use amqpsend_core::{ConnectionParameters, MECH_ANONYMOUS, MECH_EXTERNAL, MECH_PLAIN};

/// Mechanisms the engine can perform, in preference order.
pub const SUPPORTED_MECHANISMS: [&str; 3] = [MECH_EXTERNAL, MECH_PLAIN, MECH_ANONYMOUS];

/// Picks the mechanism to run from what the server offers.
///
/// With an explicit allow list the first offered mechanism on that list wins.
/// With an empty list (AUTO) the first offered mechanism the client can
/// perform wins, narrowed by `mech_list` from the SASL client configuration
/// when one was found. PLAIN needs credentials to be chosen.
pub fn select_mechanism(
    offered: &[String],
    params: &ConnectionParameters,
    mech_list: Option<&[String]>,
) -> Option<String> {
    let acceptable = |mech: &str| {
        if !params.allowed_mechanisms.is_empty() {
            return params
                .allowed_mechanisms
                .iter()
                .any(|m| m.eq_ignore_ascii_case(mech));
        }
        let supported = SUPPORTED_MECHANISMS
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mech));
        let configured =
            mech_list.is_none_or(|list| list.iter().any(|m| m.eq_ignore_ascii_case(mech)));
        let has_credentials = !mech.eq_ignore_ascii_case(MECH_PLAIN) || params.principal.is_some();
        supported && configured && has_credentials
    };
    offered
        .iter()
        .find(|mech| acceptable(mech))
        .map(|mech| mech.to_ascii_uppercase())
}

/// The sasl-init initial response for `mechanism`.
pub fn initial_response(mechanism: &str, params: &ConnectionParameters) -> Option<Vec<u8>> {
    match mechanism {
        MECH_PLAIN => {
            let principal = params.principal.as_ref()?;
            let mut response = Vec::with_capacity(
                principal.username.len() + principal.password.len() + 2,
            );
            response.push(0);
            response.extend_from_slice(principal.username.as_bytes());
            response.push(0);
            response.extend_from_slice(principal.password.as_bytes());
            Some(response)
        }
        MECH_ANONYMOUS => Some(b"anonymous".to_vec()),
        _ => Some(Vec::new()),
    }
}
