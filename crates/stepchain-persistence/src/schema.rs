//! Esquema Diesel (mantenido a mano junto a `migrations/`).

diesel::table! {
    users (id) {
        id -> Uuid,
        name -> Text,
        email -> Text,
        passhash -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    user_roles (user_id, role) {
        user_id -> Uuid,
        role -> Text,
    }
}

diesel::table! {
    histories (id) {
        id -> Uuid,
        seq -> BigInt,
        name -> Text,
        user_id -> Uuid,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    steps (id) {
        id -> Uuid,
        seq -> BigInt,
        created_at -> Timestamptz,
        type_tag -> Text,
        payload -> Text,
        previous_id -> Nullable<Uuid>,
    }
}

diesel::table! {
    history_steps (history_id, position) {
        history_id -> Uuid,
        position -> BigInt,
        step_id -> Uuid,
    }
}

diesel::joinable!(user_roles -> users (user_id));
diesel::joinable!(histories -> users (user_id));
diesel::joinable!(history_steps -> histories (history_id));
diesel::joinable!(history_steps -> steps (step_id));

diesel::allow_tables_to_appear_in_same_query!(users, user_roles, histories, steps, history_steps);
