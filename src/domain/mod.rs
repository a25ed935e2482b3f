mod column_label;
mod message_body;
mod recipient_email;
mod recipient_list;

pub use column_label::ColumnLabel;
pub use message_body::MessageBody;
pub use recipient_email::{AddressPolicy, RecipientEmail};
pub use recipient_list::RecipientList;
