//! Run-scoped record of confirmed contract addresses.

use alloy_core::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};

use crate::{
    error::ExecutionError,
    manifest::{ConstructorArg, ResolvedArg},
};

/// A contract whose deployment transaction has been confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployedContract {
    pub name: String,
    pub address: Address,
    pub deploy_tx: TxHash,
    pub confirmed: bool,
}

impl DeployedContract {
    /// Record a confirmed deployment.
    pub fn confirmed(name: impl Into<String>, address: Address, deploy_tx: TxHash) -> Self {
        Self {
            name: name.into(),
            address,
            deploy_tx,
            confirmed: true,
        }
    }
}

/// Append-only mapping from contract name to its deployment.
///
/// Entries keep their insertion order, which is the deployment order of the
/// run. A name can only be inserted once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressTable {
    entries: Vec<DeployedContract>,
}

impl AddressTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a deployment. Fails if the name already has an entry.
    pub fn insert(&mut self, contract: DeployedContract) -> Result<(), ExecutionError> {
        if self.contains(&contract.name) {
            return Err(ExecutionError::DuplicateAddress(contract.name));
        }
        self.entries.push(contract);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DeployedContract> {
        self.entries.iter().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Address of `name`, only if its deployment is confirmed.
    pub fn address_of(&self, name: &str) -> Option<Address> {
        self.get(name).filter(|c| c.confirmed).map(|c| c.address)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DeployedContract> {
        self.entries.iter()
    }

    /// Substitute every address reference in `args`.
    pub fn resolve(&self, args: &[ConstructorArg]) -> Result<Vec<ResolvedArg>, ExecutionError> {
        args.iter()
            .map(|arg| match arg {
                ConstructorArg::AddressOf { address_of } => {
                    let address = self
                        .address_of(address_of)
                        .ok_or_else(|| ExecutionError::UnresolvedAddress(address_of.clone()))?;
                    Ok(ResolvedArg::new("address", format!("0x{}", hex::encode(address))))
                }
                ConstructorArg::Literal { ty, value } => Ok(ResolvedArg::new(ty, value)),
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a AddressTable {
    type Item = &'a DeployedContract;
    type IntoIter = std::slice::Iter<'a, DeployedContract>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deployed(name: &str, byte: u8) -> DeployedContract {
        DeployedContract::confirmed(name, Address::with_last_byte(byte), TxHash::with_last_byte(byte))
    }

    #[test]
    fn test_insert_rejects_second_address_for_same_name() {
        let mut table = AddressTable::new();
        table.insert(deployed("Token", 1)).unwrap();

        let err = table.insert(deployed("Token", 2)).unwrap_err();
        assert_eq!(err, ExecutionError::DuplicateAddress("Token".to_string()));

        assert_eq!(table.len(), 1);
        assert_eq!(table.address_of("Token"), Some(Address::with_last_byte(1)));
    }

    #[test]
    fn test_keeps_insertion_order() {
        let mut table = AddressTable::new();
        table.insert(deployed("Token", 1)).unwrap();
        table.insert(deployed("Avatars", 2)).unwrap();
        table.insert(deployed("BoxSales", 3)).unwrap();

        let names: Vec<_> = table.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Token", "Avatars", "BoxSales"]);
    }

    #[test]
    fn test_unconfirmed_entry_has_no_address() {
        let mut table = AddressTable::new();
        let mut pending = deployed("Token", 1);
        pending.confirmed = false;
        table.insert(pending).unwrap();

        assert!(table.contains("Token"));
        assert_eq!(table.address_of("Token"), None);
        assert_eq!(
            table.resolve(&[ConstructorArg::address_of("Token")]),
            Err(ExecutionError::UnresolvedAddress("Token".to_string()))
        );
    }

    #[test]
    fn test_resolve_substitutes_references() {
        let mut table = AddressTable::new();
        table.insert(deployed("Token", 0xab)).unwrap();

        let resolved = table
            .resolve(&[
                ConstructorArg::address_of("Token"),
                ConstructorArg::literal("uint256", "42"),
            ])
            .unwrap();

        assert_eq!(
            resolved,
            vec![
                ResolvedArg::new("address", "0x00000000000000000000000000000000000000ab"),
                ResolvedArg::new("uint256", "42"),
            ]
        );
    }

    #[test]
    fn test_resolve_missing_reference() {
        let table = AddressTable::new();
        let err = table
            .resolve(&[ConstructorArg::address_of("Avatars")])
            .unwrap_err();
        assert_eq!(err, ExecutionError::UnresolvedAddress("Avatars".to_string()));
    }
}
