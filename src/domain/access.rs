use super::{AccessDenied, Caller, MemberId};

/// 純粋関数：呼び出し元が会員のリソースを操作できるか
///
/// 本人、または職員（Librarian / Admin）のみ許可する。
pub fn authorize(caller: &Caller, owner: MemberId) -> Result<(), AccessDenied> {
    if caller.id == owner || caller.role.is_staff() {
        Ok(())
    } else {
        Err(AccessDenied)
    }
}

/// 純粋関数：職員のみ許可する
pub fn require_staff(caller: &Caller) -> Result<(), AccessDenied> {
    if caller.role.is_staff() {
        Ok(())
    } else {
        Err(AccessDenied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[test]
    fn test_owner_is_allowed() {
        let member_id = MemberId::new();
        assert!(authorize(&Caller::student(member_id), member_id).is_ok());
    }

    #[test]
    fn test_other_student_is_denied() {
        let caller = Caller::student(MemberId::new());
        assert_eq!(authorize(&caller, MemberId::new()), Err(AccessDenied));
    }

    #[test]
    fn test_staff_can_act_for_others() {
        for role in [Role::Librarian, Role::Admin] {
            let caller = Caller::new(MemberId::new(), role);
            assert!(authorize(&caller, MemberId::new()).is_ok());
            assert!(require_staff(&caller).is_ok());
        }
    }

    #[test]
    fn test_require_staff_denies_students() {
        let caller = Caller::student(MemberId::new());
        assert_eq!(require_staff(&caller), Err(AccessDenied));
    }
}
