//! Contact and group bootstrap refresh (spec section 4.4 "Contact refresh",
//! "Group refresh").

use std::sync::Arc;

use wacli_core::entities::ChatKind;
use wacli_core::error::WacliError;
use wacli_protocol::{GroupInfo, ProtocolClient};
use wacli_store::GroupParticipant;

use crate::app::App;

impl App {
    /// `GetAllContacts` → widening-upsert every contact. Returns the count
    /// refreshed.
    pub async fn refresh_contacts(&self) -> Result<usize, WacliError> {
        let proto = self.protocol()?;
        let contacts = proto.get_all_contacts().await?;
        let now = chrono::Utc::now().timestamp();

        for c in &contacts {
            self.store
                .upsert_contact(
                    &c.jid,
                    &c.phone,
                    &c.push_name,
                    &c.full_name,
                    &c.first_name,
                    &c.business_name,
                    now,
                )
                .await?;
        }
        Ok(contacts.len())
    }

    /// `GetJoinedGroups` → persist each group plus its full participant set
    /// and the corresponding chat row (kind `group`). Returns the count
    /// refreshed.
    pub async fn refresh_groups(&self) -> Result<usize, WacliError> {
        let proto = self.protocol()?;
        let groups = proto.get_joined_groups().await?;

        for g in &groups {
            self.persist_group(g).await?;
        }
        Ok(groups.len())
    }

    /// Re-fetch and persist a single group, used by the `GroupInfo` event
    /// handler when the server reports an in-place change.
    pub(crate) async fn refresh_single_group(
        &self,
        proto: &Arc<dyn ProtocolClient>,
        jid: &str,
    ) -> Result<(), WacliError> {
        let info = proto.get_group_info(jid).await?;
        self.persist_group(&info).await
    }

    async fn persist_group(&self, g: &GroupInfo) -> Result<(), WacliError> {
        let now = chrono::Utc::now().timestamp();

        self.store
            .upsert_group(&g.jid, &g.name, &g.owner_jid, g.created_at, now)
            .await?;

        let participants: Vec<GroupParticipant> = g
            .participants
            .iter()
            .map(|(jid, role)| GroupParticipant {
                group_jid: g.jid.clone(),
                user_jid: jid.clone(),
                role: *role,
                updated_at: now,
            })
            .collect();
        self.store
            .replace_group_participants(&g.jid, &participants)
            .await?;

        self.store
            .upsert_chat(&g.jid, ChatKind::Group, &g.name, now)
            .await?;

        Ok(())
    }
}
