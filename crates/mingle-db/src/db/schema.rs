// Diesel table definitions. Kept in sync with the SQL in migrations/ by hand.

diesel::table! {
    user (id) {
        id -> Uuid,
        #[max_length = 45]
        username -> Varchar,
        #[max_length = 60]
        email -> Varchar,
        password_hash -> Text,
        birthday -> Nullable<Date>,
        is_active -> Bool,
        last_login -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event (id) {
        id -> Uuid,
        creator_id -> Uuid,
        #[max_length = 60]
        name -> Varchar,
        #[max_length = 255]
        description -> Nullable<Varchar>,
        #[max_length = 255]
        location -> Nullable<Varchar>,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
        privacy -> Text,
        recurrence -> Text,
        next_occurrence -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    category (id) {
        id -> Uuid,
        #[max_length = 45]
        name -> Varchar,
        #[max_length = 255]
        description -> Nullable<Varchar>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_category (event_id, category_id) {
        event_id -> Uuid,
        category_id -> Uuid,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    friendship (id) {
        id -> Uuid,
        requester_id -> Uuid,
        recipient_id -> Uuid,
        status -> Text,
        requested_at -> Timestamptz,
        responded_at -> Nullable<Timestamptz>,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    event_participant (event_id, user_id) {
        event_id -> Uuid,
        user_id -> Uuid,
        role -> Text,
        status -> Text,
        responded_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(event -> user (creator_id));
diesel::joinable!(event_category -> event (event_id));
diesel::joinable!(event_category -> category (category_id));
diesel::joinable!(event_participant -> event (event_id));
diesel::joinable!(event_participant -> user (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    user,
    event,
    category,
    event_category,
    friendship,
    event_participant,
);
