//! Account credential parsing
//!
//! Accounts are supplied as a single delimited string, e.g.
//! `email1:password1,email2:password2` (comma or semicolon separated).

/// A single dashboard account
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
}

/// Parse a delimited account list.
///
/// Entries are split on `,` or `;`, each entry on the first `:`. Both halves
/// are trimmed; entries missing either half are dropped silently.
pub fn parse_accounts(raw: &str) -> Vec<Account> {
    raw.split([',', ';'])
        .filter_map(|entry| {
            let (email, password) = entry.split_once(':')?;
            let email = email.trim();
            let password = password.trim();
            if email.is_empty() || password.is_empty() {
                return None;
            }
            Some(Account {
                email: email.to_string(),
                password: password.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_and_semicolon_separated_pairs() {
        let accounts = parse_accounts("a@x.com:p1;b@x.com:p2");
        assert_eq!(
            accounts,
            vec![
                Account { email: "a@x.com".into(), password: "p1".into() },
                Account { email: "b@x.com".into(), password: "p2".into() },
            ]
        );

        let accounts = parse_accounts("a@x.com:p1,b@x.com:p2");
        assert_eq!(accounts.len(), 2);
    }

    #[test]
    fn trims_whitespace_around_fields() {
        let accounts = parse_accounts("  a@x.com : p1 ; b@x.com:p2  ");
        assert_eq!(accounts[0].email, "a@x.com");
        assert_eq!(accounts[0].password, "p1");
        assert_eq!(accounts[1].password, "p2");
    }

    #[test]
    fn drops_entries_missing_email_or_password() {
        let accounts = parse_accounts("a@x.com:p1;:p2;b@x.com:;c@x.com");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].email, "a@x.com");
    }

    #[test]
    fn all_invalid_input_yields_empty_list() {
        assert!(parse_accounts("").is_empty());
        assert!(parse_accounts(";;,,").is_empty());
        assert!(parse_accounts("no-colon-here").is_empty());
    }

    #[test]
    fn password_may_contain_colons() {
        let accounts = parse_accounts("a@x.com:p:1:2");
        assert_eq!(accounts[0].password, "p:1:2");
    }
}
