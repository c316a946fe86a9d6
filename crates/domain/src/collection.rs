/// Record collections used by the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    /// One profile per identity.
    Profiles,
    /// Tutoring leads offered in the marketplace.
    Leads,
    /// Tutor applications to leads.
    Applications,
    /// Wallet transactions.
    Transactions,
    /// Support tickets.
    SupportTickets,
}

impl Collection {
    /// Returns the canonical collection name.
    ///
    /// Backends may store a collection under a different name; adapters own
    /// that mapping.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Profiles => "profiles",
            Self::Leads => "leads",
            Self::Applications => "applications",
            Self::Transactions => "transactions",
            Self::SupportTickets => "support_tickets",
        }
    }

    /// Returns all known collections.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Collection] = &[
            Collection::Profiles,
            Collection::Leads,
            Collection::Applications,
            Collection::Transactions,
            Collection::SupportTickets,
        ];

        ALL
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}
