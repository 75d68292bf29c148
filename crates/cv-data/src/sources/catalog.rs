use cv_core::{DatasetId, FilterField, FilterSet};

/// Static description of a dataset: its filter vocabulary and the columns a
/// table shows first
#[derive(Debug, Clone)]
pub struct DatasetDefinition {
    pub id: DatasetId,
    pub fields: Vec<FilterField>,
    pub display_columns: Vec<&'static str>,
}

impl DatasetDefinition {
    pub fn talkdesk() -> Self {
        Self {
            id: DatasetId::Talkdesk,
            fields: vec![
                FilterField::new("InteractionID", "Interaction_ID"),
                FilterField::new("CustomerNumber", "Customer_Phone_Number"),
                FilterField::new("TalkdeskNumber", "Talkdesk_Phone_Number"),
                FilterField::new("CallType", "Call_Type"),
            ],
            display_columns: vec![
                "Interaction_ID",
                "Call_Type",
                "Start_Time",
                "End_Time",
                "Talkdesk_Phone_Number",
                "Customer_Phone_Number",
                "Tags",
                "Talk_Time",
                "Hangup",
                "In_Business_Hours?",
                "Agent_Name",
                "Phone_Display_Name",
                "Handling_Agent",
            ],
        }
    }

    pub fn vpi() -> Self {
        Self {
            id: DatasetId::Vpi,
            fields: vec![
                FilterField::new("ObjectId", "objectID"),
                FilterField::new("ExtensionNumber", "extensionNum"),
                FilterField::new("ChannelNumber", "channelNum"),
                FilterField::new("AniAliDigits", "AniAliDigits"),
                FilterField::new("Name", "Name"),
            ],
            display_columns: vec![
                "FileName",
                "objectID",
                "startTime",
                "channelName",
                "direction",
                "duration",
                "extensionNum",
                "gmtStartTime",
                "name",
                "agentID",
                "mediaManagerID",
                "mediaFileID",
            ],
        }
    }

    pub fn of(id: DatasetId) -> Self {
        match id {
            DatasetId::Talkdesk => Self::talkdesk(),
            DatasetId::Vpi => Self::vpi(),
        }
    }

    /// Empty filter set over this dataset's vocabulary
    pub fn filter_set(&self) -> FilterSet {
        FilterSet::new(self.fields.clone())
    }

    /// Display columns first, then any other column of `columns` in order
    pub fn ordered_columns(&self, columns: &[String]) -> Vec<String> {
        let mut ordered: Vec<String> = self
            .display_columns
            .iter()
            .filter(|c| columns.iter().any(|col| col == *c))
            .map(|c| c.to_string())
            .collect();
        for column in columns {
            if !ordered.contains(column) {
                ordered.push(column.clone());
            }
        }
        ordered
    }
}
