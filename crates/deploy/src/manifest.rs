//! Static description of a deployment: the contracts to instantiate and the
//! wiring calls to run once they are all confirmed.
//!
//! Both [`ContractSpec`] and [`WiringStep`] are plain data, written by hand in
//! the `Rigger.toml` plan file:
//!
//! ```toml
//! [[contracts]]
//! name = "BoxSales"
//! depends_on = ["Token", "Avatars"]
//! args = [{ address_of = "Token" }, { address_of = "Avatars" }]
//!
//! [[wiring]]
//! target = "Token"
//! operation = "addMinter"
//! args = [{ address_of = "BoxSales" }]
//! ```

use serde::{Deserialize, Serialize};

/// A single constructor or call argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstructorArg {
    /// Forward reference to the confirmed address of another contract of the plan.
    AddressOf { address_of: String },
    /// A literal value, given as its ABI type and textual representation.
    Literal {
        #[serde(rename = "type")]
        ty: String,
        value: String,
    },
}

impl ConstructorArg {
    /// Build a literal argument, e.g. `ConstructorArg::literal("uint256", "1000")`.
    pub fn literal(ty: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Literal {
            ty: ty.into(),
            value: value.into(),
        }
    }

    /// Build a reference to the address of the contract named `name`.
    pub fn address_of(name: impl Into<String>) -> Self {
        Self::AddressOf {
            address_of: name.into(),
        }
    }

    /// The contract name this argument refers to, if it is a reference.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::AddressOf { address_of } => Some(address_of),
            Self::Literal { .. } => None,
        }
    }

    /// The ABI type this argument is encoded as.
    pub fn abi_type(&self) -> &str {
        match self {
            Self::AddressOf { .. } => "address",
            Self::Literal { ty, .. } => ty,
        }
    }
}

/// Declaration of one contract to deploy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractSpec {
    /// Logical name, unique inside a plan. Used as the AddressTable key.
    pub name: String,
    /// Registry key of the artifact to deploy. Defaults to `name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    /// Constructor arguments, in order.
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
    /// Contracts that must be confirmed before this one is deployed.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

impl ContractSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artifact: None,
            args: Vec::new(),
            depends_on: Vec::new(),
        }
    }

    /// Deploy the artifact registered under `artifact` instead of `name`.
    pub fn artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = Some(artifact.into());
        self
    }

    /// Append a constructor argument.
    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Declare a dependency on another contract of the plan.
    pub fn depends_on(mut self, name: impl Into<String>) -> Self {
        self.depends_on.push(name.into());
        self
    }

    /// The registry key for this contract.
    pub fn artifact_name(&self) -> &str {
        self.artifact.as_deref().unwrap_or(&self.name)
    }

    /// Names of the contracts whose addresses appear in the constructor arguments.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(ConstructorArg::reference)
    }
}

/// A post-deployment configuration call.
///
/// Wiring operations must be idempotent setters or grants: running the same
/// step twice against the same contracts re-asserts the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WiringStep {
    /// Name of the contract the call is sent to.
    pub target: String,
    /// Function name (`addMinter`) or full signature (`grantRole(bytes32,address)`).
    pub operation: String,
    #[serde(default)]
    pub args: Vec<ConstructorArg>,
}

impl WiringStep {
    pub fn new(target: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            operation: operation.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: ConstructorArg) -> Self {
        self.args.push(arg);
        self
    }

    /// Every contract name this step needs an address for, target first.
    pub fn references(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.target.as_str()).chain(self.args.iter().filter_map(ConstructorArg::reference))
    }

    /// Human readable label, e.g. `Token.addMinter`.
    pub fn label(&self) -> String {
        format!("{}.{}", self.target, self.operation)
    }
}

/// An argument with every reference substituted by a confirmed address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResolvedArg {
    #[serde(rename = "type")]
    pub ty: String,
    pub value: String,
}

impl ResolvedArg {
    pub fn new(ty: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            ty: ty.into(),
            value: value.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Plan {
        contracts: Vec<ContractSpec>,
        wiring: Vec<WiringStep>,
    }

    #[test]
    fn test_parse_plan_from_toml() {
        let plan: Plan = toml::from_str(
            r#"
            [[contracts]]
            name = "Token"
            artifact = "GameToken"
            args = [{ type = "uint256", value = "1000" }]

            [[contracts]]
            name = "BoxSales"
            depends_on = ["Token"]
            args = [{ address_of = "Token" }]

            [[wiring]]
            target = "Token"
            operation = "addMinter"
            args = [{ address_of = "BoxSales" }]
            "#,
        )
        .unwrap();

        assert_eq!(plan.contracts.len(), 2);
        assert_eq!(plan.contracts[0].artifact_name(), "GameToken");
        assert_eq!(
            plan.contracts[0].args,
            vec![ConstructorArg::literal("uint256", "1000")]
        );
        assert_eq!(plan.contracts[1].artifact_name(), "BoxSales");
        assert_eq!(plan.contracts[1].references().collect::<Vec<_>>(), vec!["Token"]);
        assert_eq!(plan.wiring[0].label(), "Token.addMinter");
    }

    #[test]
    fn test_wiring_references_include_target() {
        let step = WiringStep::new("Avatars", "setSalesAddress")
            .arg(ConstructorArg::address_of("BoxSales"))
            .arg(ConstructorArg::literal("bool", "true"));

        assert_eq!(
            step.references().collect::<Vec<_>>(),
            vec!["Avatars", "BoxSales"]
        );
    }

    #[test]
    fn test_abi_type_of_reference_is_address() {
        assert_eq!(ConstructorArg::address_of("Token").abi_type(), "address");
        assert_eq!(ConstructorArg::literal("uint8", "3").abi_type(), "uint8");
    }
}
