//! Diesel schema for run ledger persistence.

diesel::table! {
    /// Dispatched-run records keyed by correlation key and workflow.
    run_records (id) {
        /// Internal record identifier.
        id -> Uuid,
        /// Correlation key component of the idempotency key; unique
        /// together with `workflow_id`.
        #[max_length = 256]
        correlation_key -> Varchar,
        /// Workflow component of the idempotency key.
        #[max_length = 255]
        workflow_id -> Varchar,
        /// Repository owner segment.
        #[max_length = 255]
        repo_owner -> Varchar,
        /// Repository name segment.
        #[max_length = 255]
        repo_name -> Varchar,
        /// Git reference the workflow ran against.
        #[max_length = 255]
        git_ref -> Varchar,
        /// Provider run identifier; null for failed starts.
        external_run_id -> Nullable<Int8>,
        /// Run browse URL.
        run_url -> Nullable<Varchar>,
        /// Normalized run status.
        #[max_length = 50]
        status -> Varchar,
        /// Raw provider status from the latest applied poll.
        #[max_length = 50]
        raw_status -> Nullable<Varchar>,
        /// Raw provider conclusion from the latest applied poll.
        #[max_length = 50]
        raw_conclusion -> Nullable<Varchar>,
        /// Dispatch timestamp.
        dispatched_at -> Timestamptz,
        /// Latest applied observation timestamp.
        last_polled_at -> Nullable<Timestamptz>,
        /// Completion timestamp.
        completed_at -> Nullable<Timestamptz>,
        /// Attached ingest payload.
        ingested -> Nullable<Jsonb>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}
