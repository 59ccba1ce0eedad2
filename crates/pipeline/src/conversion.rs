use shared::{
    domain::{Client, Contact, Deal, Stage},
    protocol::ClientDraft,
};

/// Client to create for a contact whose deal just closed as won.
///
/// Returns `None` when the deal is not won or the contact already has a
/// client with the same `(email, account_id)`, so repeated calls after the
/// first conversion never produce a duplicate.
pub fn on_deal_won(
    deal: &Deal,
    contact: &Contact,
    existing_clients: &[Client],
) -> Option<ClientDraft> {
    if deal.stage != Stage::ClosedWon {
        return None;
    }
    if existing_clients
        .iter()
        .any(|client| client_matches_contact(client, contact))
    {
        return None;
    }

    Some(ClientDraft {
        first_name: contact.first_name.clone(),
        last_name: contact.last_name.clone(),
        email: contact.email.clone(),
        phone: contact.phone.clone(),
        company: contact.company.clone(),
        job_title: contact.job_title.clone(),
        account_id: contact.account_id.clone(),
        relationship_level: contact.relationship_level,
        notes: format!("Converted from won deal \"{}\"", deal.title),
    })
}

pub fn client_matches_contact(client: &Client, contact: &Contact) -> bool {
    same_email(&client.email, &contact.email) && client.account_id == contact.account_id
}

fn same_email(left: &str, right: &str) -> bool {
    left.trim().eq_ignore_ascii_case(right.trim())
}

#[cfg(test)]
#[path = "tests/conversion_tests.rs"]
mod tests;
