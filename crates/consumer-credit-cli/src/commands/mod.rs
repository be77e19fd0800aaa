pub mod consumer_credit;
pub mod time_value;
