//! Admin role membership.

use std::collections::BTreeSet;

use cadence_types::Address;

use crate::{Result, SentryError};

/// Set of accounts holding the admin role.
#[derive(Debug, Clone, Default)]
pub struct AdminRole {
    admins: BTreeSet<Address>,
}

impl AdminRole {
    /// Create the role with one initial holder.
    pub fn new(initial_admin: Address) -> Self {
        Self {
            admins: BTreeSet::from([initial_admin]),
        }
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.admins.contains(account)
    }

    /// Fail unless `caller` holds the role.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    pub fn authorize(&self, caller: &Address) -> Result<()> {
        if !self.contains(caller) {
            tracing::warn!(%caller, "unauthorized admin call");
            return Err(SentryError::Unauthorized(*caller));
        }
        Ok(())
    }

    /// Grant the role to `account`. `caller` must be an admin.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    /// - [`SentryError::AdminAlreadyGranted`] if `account` already holds it
    pub fn grant(&mut self, caller: &Address, account: Address) -> Result<()> {
        self.authorize(caller)?;
        if !self.admins.insert(account) {
            return Err(SentryError::AdminAlreadyGranted(account));
        }
        tracing::info!(%caller, %account, "admin role granted");
        Ok(())
    }

    /// Revoke the role from `account`. `caller` must be an admin; an admin
    /// may revoke itself.
    ///
    /// # Errors
    ///
    /// - [`SentryError::Unauthorized`] if `caller` is not an admin
    /// - [`SentryError::AdminNotFound`] if `account` does not hold it
    pub fn revoke(&mut self, caller: &Address, account: &Address) -> Result<()> {
        self.authorize(caller)?;
        if !self.admins.remove(account) {
            return Err(SentryError::AdminNotFound(*account));
        }
        tracing::info!(%caller, %account, "admin role revoked");
        Ok(())
    }

    pub fn members(&self) -> impl Iterator<Item = &Address> {
        self.admins.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIN: Address = Address::repeat(0x01);
    const OTHER: Address = Address::repeat(0x02);

    #[test]
    fn test_initial_admin() {
        let role = AdminRole::new(ADMIN);
        assert!(role.contains(&ADMIN));
        assert!(role.authorize(&ADMIN).is_ok());
        assert_eq!(
            role.authorize(&OTHER).unwrap_err(),
            SentryError::Unauthorized(OTHER)
        );
    }

    #[test]
    fn test_grant_and_revoke() {
        let mut role = AdminRole::new(ADMIN);
        role.grant(&ADMIN, OTHER).expect("grant");
        assert!(role.contains(&OTHER));
        assert_eq!(
            role.grant(&ADMIN, OTHER).unwrap_err(),
            SentryError::AdminAlreadyGranted(OTHER)
        );

        role.revoke(&OTHER, &ADMIN).expect("revoke");
        assert!(!role.contains(&ADMIN));
        assert_eq!(
            role.revoke(&OTHER, &ADMIN).unwrap_err(),
            SentryError::AdminNotFound(ADMIN)
        );
        assert_eq!(role.members().count(), 1);
    }

    #[test]
    fn test_non_admin_cannot_grant() {
        let mut role = AdminRole::new(ADMIN);
        assert_eq!(
            role.grant(&OTHER, OTHER).unwrap_err(),
            SentryError::Unauthorized(OTHER)
        );
        assert!(!role.contains(&OTHER));
    }
}
