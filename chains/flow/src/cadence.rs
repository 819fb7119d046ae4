use serde_json::{json, Value};

/// Contract holding the user accounts on Flow.
pub const CONTRACT_NAME: &str = "UserAccountManager2";

/// A transaction whose parameters are all `String` and whose `execute`
/// block is a single contract call forwarding them by name.
pub fn transaction(contract_address: &str, function: &str, params: &[&str]) -> String {
    let signature = params
        .iter()
        .map(|p| format!("{}: String", p))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "import {contract} from {address}\n\n\
         transaction({signature}) {{\n  prepare(acct: &Account) {{}}\n\n  \
         execute {{\n    {contract}.{function}({call_args})\n  }}\n}}\n",
        contract = CONTRACT_NAME,
        address = contract_address,
        signature = signature,
        function = function,
        call_args = labelled(params),
    )
}

/// A read-only script taking one `String` and returning `return_type`.
pub fn script(contract_address: &str, function: &str, param: &str, return_type: &str) -> String {
    let return_type = return_type.replace("{contract}", CONTRACT_NAME);
    format!(
        "import {contract} from {address}\n\n\
         access(all) fun main({param}: String): {ret} {{\n  \
         return {contract}.{function}({call_args})\n}}\n",
        contract = CONTRACT_NAME,
        address = contract_address,
        param = param,
        ret = return_type,
        function = function,
        call_args = labelled(&[param]),
    )
}

fn labelled(params: &[&str]) -> String {
    params
        .iter()
        .map(|p| format!("{p}: {p}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// JSON-Cadence argument list for `--args-json`.
pub fn string_args(values: &[&str]) -> String {
    let args: Vec<Value> = values
        .iter()
        .map(|v| json!({ "type": "String", "value": v }))
        .collect();
    Value::Array(args).to_string()
}
