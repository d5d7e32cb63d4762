//! 権限チェック
//!
//! 呼び出し元のロールフラグだけを見る純粋な述語。I/Oもエラーもない。

use crate::commands::InvocationContext;

/// 配信者本人か
pub fn is_broadcaster(ctx: &InvocationContext) -> bool {
    ctx.roles.broadcaster
}

/// モデレーターか
pub fn is_moderator(ctx: &InvocationContext) -> bool {
    ctx.roles.moderator
}

/// コマンドが要求する権限
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// モデレーターまたは配信者
    Moderator,
    /// 配信者のみ
    Broadcaster,
}

impl Requirement {
    pub fn allows(&self, ctx: &InvocationContext) -> bool {
        match self {
            Requirement::Moderator => is_moderator(ctx) || is_broadcaster(ctx),
            Requirement::Broadcaster => is_broadcaster(ctx),
        }
    }

    /// 拒否時の返信（誰なら使えるかを伝える）
    pub fn rejection(&self) -> &'static str {
        match self {
            Requirement::Moderator => crate::commands::messages::MOD_ONLY,
            Requirement::Broadcaster => crate::commands::messages::BROADCASTER_ONLY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Roles;

    fn ctx(broadcaster: bool, moderator: bool) -> InvocationContext {
        InvocationContext::new("someone", "msg-1", Vec::new()).with_roles(Roles {
            broadcaster,
            moderator,
        })
    }

    #[test]
    fn test_role_predicates() {
        assert!(is_broadcaster(&ctx(true, false)));
        assert!(!is_moderator(&ctx(true, false)));
        assert!(is_moderator(&ctx(false, true)));
        assert!(!is_broadcaster(&ctx(false, false)));
        assert!(!is_moderator(&ctx(false, false)));
    }

    #[test]
    fn test_moderator_requirement_accepts_broadcaster() {
        assert!(Requirement::Moderator.allows(&ctx(true, false)));
        assert!(Requirement::Moderator.allows(&ctx(false, true)));
        assert!(!Requirement::Moderator.allows(&ctx(false, false)));
    }

    #[test]
    fn test_broadcaster_requirement_rejects_moderator() {
        assert!(Requirement::Broadcaster.allows(&ctx(true, false)));
        assert!(!Requirement::Broadcaster.allows(&ctx(false, true)));
    }

    #[test]
    fn test_rejections_differ() {
        assert_ne!(
            Requirement::Moderator.rejection(),
            Requirement::Broadcaster.rejection()
        );
    }
}
