//! Diesel schema for issue lifecycle persistence.

diesel::table! {
    /// Issue records with canonical-ID correlation and mirror binding.
    issues (id) {
        /// Internal issue identifier.
        id -> Uuid,
        /// Canonical identifier; unique across all issues.
        #[max_length = 128]
        canonical_id -> Varchar,
        /// Issue lifecycle state.
        #[max_length = 50]
        state -> Varchar,
        /// Optional mirror reference payload.
        mirror -> Nullable<Jsonb>,
        /// Optimistic-concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
