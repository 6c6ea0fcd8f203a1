use crate::{error::ArchiverResult, Archiver, ArchiverError};
use archiver_l1::L1View;
use archiver_store::ArchiverStore;

impl<L1, S> Archiver<L1, S>
where
    L1: L1View,
    S: ArchiverStore + Clone,
{
    /// Retrieves the L1 to L2 messages inserted after `messages_synced_to`, up to the current L1
    /// block.
    ///
    /// The message pointer only moves to the last L1 block a message was found in, unless the
    /// local message count already matches the inbox.
    #[tracing::instrument(skip(self))]
    pub(crate) async fn handle_l1_to_l2_messages(
        &self,
        messages_synced_to: u64,
        current_l1_block: u64,
    ) -> ArchiverResult<()> {
        if current_l1_block <= messages_synced_to {
            return Ok(());
        }

        let local_total = self.store.get_total_l1_to_l2_message_count().await?;
        let remote_total = self.l1.get_total_messages_inserted().await?;
        if local_total == remote_total {
            self.store.set_messages_synced_to(current_l1_block).await?;
            tracing::debug!(
                target: "archiver::messages",
                total = local_total,
                current_l1_block,
                "L1 to L2 messages already synced"
            );
            return Ok(());
        }

        let mut search_end = messages_synced_to;
        let mut downloaded = 0;
        loop {
            let (start, end) = self.planner.next_range(search_end, current_l1_block);
            let messages = self.l1.retrieve_messages(start, end).await?;
            tracing::trace!(
                target: "archiver::messages",
                start,
                end,
                count = messages.len(),
                "retrieved L1 to L2 messages"
            );

            if !self.store.add_l1_to_l2_messages(&messages).await? {
                return Err(ArchiverError::StoreWriteFailed("add L1 to L2 messages"));
            }
            for message in &messages.retrieved_data {
                tracing::trace!(target: "archiver::messages", %message, "stored L1 to L2 message");
            }
            downloaded += messages.len();

            search_end = end;
            if search_end >= current_l1_block {
                break;
            }
        }

        self.metrics.messages_synced.increment(downloaded as u64);
        tracing::info!(
            target: "archiver::messages",
            downloaded,
            local_total = local_total + downloaded as u64,
            remote_total,
            "synced L1 to L2 messages"
        );

        Ok(())
    }
}
