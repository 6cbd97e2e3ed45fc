#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Role {
    Admin,
    Usuario,
}

impl Role {
    /// Any role name other than `admin` is a regular user.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Usuario
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_maps_to_admin() {
        assert_eq!(Role::from_name("admin"), Role::Admin);
        assert_eq!(Role::from_name(" Admin "), Role::Admin);
        assert_eq!(Role::from_name("supervisor"), Role::Usuario);
        assert_eq!(Role::from_name(""), Role::Usuario);
    }
}
